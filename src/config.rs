//! logcheck configuration.
//!
//! Loaded from `~/.logcheck/config.toml`. Every key is optional; a missing
//! file means defaults.

use std::fs;
use std::path::{Path, PathBuf};

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::model::OutcomeSet;
use crate::reminder::{DEFAULT_INTERVAL, DEFAULT_SNOOZE, ReminderSettings};
use crate::storage::DATABASE_FILE;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// logcheck configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Recognized check outcomes, in display order.
    pub outcomes: OutcomeSet,

    /// Time between reminders, e.g. `"2h"` or `"90m"`.
    pub reminder_interval: SignedDuration,

    /// How long "not now" defers a reminder.
    pub snooze: SignedDuration,

    /// Where the record database lives. Defaults to `~/.logcheck`.
    pub data_dir: Option<PathBuf>,

    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            outcomes: OutcomeSet::default(),
            reminder_interval: DEFAULT_INTERVAL,
            snooze: DEFAULT_SNOOZE,
            data_dir: None,
            log_filter: None,
        }
    }
}

impl Config {
    /// Load config from `~/.logcheck/config.toml`, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path().ok_or(ConfigError::NoHome)?;
        Self::load_from(&path)
    }

    /// Load and validate config from `path`, or defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outcomes.is_empty() {
            return Err(ConfigError::Invalid(
                "outcomes must name at least one outcome".into(),
            ));
        }
        if self.outcomes.as_slice().iter().any(|o| o.trim().is_empty()) {
            return Err(ConfigError::Invalid("outcomes must not be blank".into()));
        }
        if let Some(dup) = self.outcomes.first_duplicate() {
            return Err(ConfigError::Invalid(format!(
                "outcome '{dup}' is listed more than once"
            )));
        }
        self.reminder_settings()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn reminder_settings(&self) -> ReminderSettings {
        ReminderSettings {
            interval: self.reminder_interval,
            snooze: self.snooze,
        }
    }

    /// The config file path: `~/.logcheck/config.toml`.
    pub fn path() -> Option<PathBuf> {
        Self::default_data_dir().map(|d| d.join("config.toml"))
    }

    /// `~/.logcheck`.
    pub fn default_data_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".logcheck"))
    }

    /// The record database path, honoring `data-dir`.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => Self::default_data_dir().ok_or(ConfigError::NoHome)?,
        };
        Ok(dir.join(DATABASE_FILE))
    }
}
