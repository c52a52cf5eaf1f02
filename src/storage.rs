//! Local persistence for check records.
//!
//! All records live in a single `SQLite` file:
//!
//! ```text
//! <data-dir>/checks.sqlite
//!   check_records(id, timestamp, outcome, notes, created_at)
//! ```
//!
//! Writes go through one connection behind a mutex, one transaction each.
//! Reads use a small pool of read-only connections; WAL mode keeps them
//! from ever observing a half-applied write.

mod read_pool;
mod records;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::{fs, io};

use rusqlite::Connection;
use tracing::debug;

use crate::model::{OutcomeSet, RecordId};

use read_pool::ReadPool;

/// File name of the record database inside the data directory.
pub const DATABASE_FILE: &str = "checks.sqlite";

/// Bumped whenever `migrate` learns a new step.
const SCHEMA_VERSION: i32 = 1;

const READ_POOL_SIZE: usize = 2;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("check record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt record data: {0}")]
    Corrupt(String),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Durable table of check records.
pub struct RecordStore {
    writer: Mutex<Connection>,
    readers: ReadPool,
    path: PathBuf,
    outcomes: OutcomeSet,
}

impl RecordStore {
    /// Opens (or creates) the record database at `path`.
    ///
    /// Parent directories are created if they don't exist. Outcomes passed to
    /// `create` and `update` must belong to `outcomes`.
    pub fn open(path: impl Into<PathBuf>, outcomes: OutcomeSet) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let writer = Connection::open(&path)?;
        apply_write_pragmas(&writer)?;
        migrate(&writer)?;

        let readers = ReadPool::open(&path, READ_POOL_SIZE)?;
        debug!(path = %path.display(), "record store opened");

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            path,
            outcomes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn outcomes(&self) -> &OutcomeSet {
        &self.outcomes
    }

    /// Checks `outcome` against the recognized set, returning its canonical label.
    fn validate_outcome(&self, outcome: &str) -> Result<String> {
        self.outcomes
            .resolve(outcome)
            .map(str::to_string)
            .ok_or_else(|| {
                StorageError::Invalid(format!(
                    "unrecognized outcome '{}' (expected one of: {})",
                    outcome.trim(),
                    self.outcomes.as_slice().join(", ")
                ))
            })
    }

    /// The single write connection. A panic mid-write rolls back its
    /// transaction, so a poisoned lock still guards a consistent database.
    fn writer(&self) -> MutexGuard<'_, Connection> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn apply_write_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = FULL;
        PRAGMA busy_timeout = 5000;
        ",
    )?;
    Ok(())
}

/// Brings the schema up to [`SCHEMA_VERSION`].
fn migrate(conn: &Connection) -> Result<()> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(StorageError::Corrupt(format!(
            "database schema version {version} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    if version < 1 {
        conn.execute_batch(
            "
            BEGIN;
            CREATE TABLE IF NOT EXISTS check_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                outcome TEXT NOT NULL,
                notes TEXT,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS check_records_timestamp
                ON check_records (timestamp);
            PRAGMA user_version = 1;
            COMMIT;
            ",
        )?;
        debug!("record schema migrated to version 1");
    }

    Ok(())
}
