//! Crate-wide error type and its operator-facing classification.

use crate::config::ConfigError;
use crate::model::InputError;
use crate::reminder::ReminderError;
use crate::storage::StorageError;

/// Broad class of a failure, for deciding how to present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// A record id that does not exist.
    NotFound,
    /// Persistence unavailable or a write failed.
    Storage,
    /// Invalid configuration.
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Reminder(#[from] ReminderError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(StorageError::RecordNotFound(_)) => ErrorKind::NotFound,
            Self::Storage(StorageError::Invalid(_)) | Self::Input(_) => ErrorKind::Validation,
            Self::Storage(_) | Self::Output(_) => ErrorKind::Storage,
            Self::Reminder(ReminderError::NotRunning) => ErrorKind::Validation,
            Self::Reminder(_) | Self::Config(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::SignedDuration;

    #[test]
    fn kinds_follow_taxonomy() {
        let not_found: Error = StorageError::RecordNotFound(3).into();
        let invalid: Error = StorageError::Invalid("bad outcome".into()).into();
        let corrupt: Error = StorageError::Corrupt("bad row".into()).into();
        let interval: Error = ReminderError::NonPositive {
            what: "reminder interval",
            value: SignedDuration::ZERO,
        }
        .into();
        let stopped: Error = ReminderError::NotRunning.into();
        let input: Error = InputError::EmptySelection.into();
        let output: Error = std::io::Error::other("disk full").into();

        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(invalid.kind(), ErrorKind::Validation);
        assert_eq!(corrupt.kind(), ErrorKind::Storage);
        assert_eq!(interval.kind(), ErrorKind::Config);
        assert_eq!(stopped.kind(), ErrorKind::Validation);
        assert_eq!(input.kind(), ErrorKind::Validation);
        assert_eq!(output.kind(), ErrorKind::Storage);
    }
}
