//! Check record storage: create, get, list, update, delete.

use jiff::Timestamp;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::debug;

use crate::model::{CheckRecord, RecordFilter, RecordId, RecordPatch, SortOrder};

use super::{RecordStore, Result, StorageError};

const SELECT_COLUMNS: &str = "SELECT id, timestamp, outcome, notes, created_at FROM check_records";

impl RecordStore {
    /// Persists a new check record and returns its id.
    pub fn create(
        &self,
        timestamp: Timestamp,
        outcome: &str,
        notes: Option<&str>,
    ) -> Result<RecordId> {
        let outcome = self.validate_outcome(outcome)?;
        let timestamp = to_nanos(timestamp)?;
        let created_at = to_nanos(Timestamp::now())?;

        let mut conn = self.writer();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO check_records (timestamp, outcome, notes, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![timestamp, &outcome, notes, created_at],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(id, %outcome, "check record created");
        Ok(id)
    }

    /// Loads a single record.
    pub fn get(&self, id: RecordId) -> Result<CheckRecord> {
        self.readers
            .with_conn(|conn| fetch(conn, id))?
            .ok_or(StorageError::RecordNotFound(id))
    }

    /// Lists records matching `filter`, ordered by check timestamp.
    ///
    /// Records sharing a timestamp are ordered by id in the same direction.
    pub fn list(&self, filter: &RecordFilter, order: SortOrder) -> Result<Vec<CheckRecord>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1 = 1");
        let mut values = Vec::new();

        if let Some(outcome) = &filter.outcome {
            sql.push_str(" AND outcome = ?");
            values.push(Value::Text(outcome.trim().to_string()));
        }
        if let Some(range) = &filter.range {
            sql.push_str(" AND timestamp >= ? AND timestamp <= ?");
            values.push(Value::Integer(clamp_nanos(range.start())));
            values.push(Value::Integer(clamp_nanos(range.end())));
        }

        sql.push_str(match order {
            SortOrder::NewestFirst => " ORDER BY timestamp DESC, id DESC",
            SortOrder::OldestFirst => " ORDER BY timestamp ASC, id ASC",
        });

        // SQLite treats a negative LIMIT as "no limit".
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(Value::Integer(
            filter
                .limit
                .map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX)),
        ));
        values.push(Value::Integer(
            i64::try_from(filter.offset).unwrap_or(i64::MAX),
        ));

        self.readers.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), RawRecord::read)?;
            rows.map(|row| row?.into_record()).collect()
        })
    }

    /// Applies `patch` to an existing record and returns the result.
    ///
    /// The id and creation time never change.
    pub fn update(&self, id: RecordId, patch: &RecordPatch) -> Result<CheckRecord> {
        let mut conn = self.writer();
        let tx = conn.transaction()?;
        let mut record = fetch(&tx, id)?.ok_or(StorageError::RecordNotFound(id))?;
        let outcome = patch
            .outcome
            .as_deref()
            .map(|o| self.validate_outcome(o))
            .transpose()?;

        if let Some(timestamp) = patch.timestamp {
            record.timestamp = timestamp;
        }
        if let Some(outcome) = outcome {
            record.outcome = outcome;
        }
        if let Some(notes) = &patch.notes {
            record.notes.clone_from(notes);
        }

        tx.execute(
            "UPDATE check_records SET timestamp = ?1, outcome = ?2, notes = ?3 WHERE id = ?4",
            params![
                to_nanos(record.timestamp)?,
                &record.outcome,
                &record.notes,
                id
            ],
        )?;
        tx.commit()?;

        debug!(id, "check record updated");
        Ok(record)
    }

    /// Removes a record. Deleting an id that is already gone fails.
    pub fn delete(&self, id: RecordId) -> Result<()> {
        let rows = self
            .writer()
            .execute("DELETE FROM check_records WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StorageError::RecordNotFound(id));
        }
        debug!(id, "check record deleted");
        Ok(())
    }

    /// Total number of stored records.
    pub fn count(&self) -> Result<u64> {
        let n: i64 = self.readers.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM check_records", [], |row| row.get(0))?)
        })?;
        u64::try_from(n).map_err(|_| StorageError::Corrupt(format!("negative row count {n}")))
    }

    /// Deletes every record checked strictly before `cutoff`, returning how many went.
    pub fn purge_before(&self, cutoff: Timestamp) -> Result<usize> {
        let removed = self.writer().execute(
            "DELETE FROM check_records WHERE timestamp < ?1",
            params![clamp_nanos(cutoff)],
        )?;
        debug!(removed, %cutoff, "check records purged");
        Ok(removed)
    }
}

/// Reads one record by id on any connection.
fn fetch(conn: &Connection, id: RecordId) -> Result<Option<CheckRecord>> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
        params![id],
        RawRecord::read,
    )
    .optional()?
    .map(RawRecord::into_record)
    .transpose()
}

/// Column values as stored, before timestamp decoding.
struct RawRecord {
    id: RecordId,
    timestamp: i64,
    outcome: String,
    notes: Option<String>,
    created_at: i64,
}

impl RawRecord {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            outcome: row.get(2)?,
            notes: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_record(self) -> Result<CheckRecord> {
        Ok(CheckRecord {
            id: self.id,
            timestamp: from_nanos(self.timestamp, "timestamp")?,
            outcome: self.outcome,
            notes: self.notes,
            created_at: from_nanos(self.created_at, "created_at")?,
        })
    }
}

/// Timestamps are stored as Unix nanoseconds so that SQL ordering is exact.
fn to_nanos(ts: Timestamp) -> Result<i64> {
    i64::try_from(ts.as_nanosecond())
        .map_err(|_| StorageError::Invalid(format!("timestamp {ts} is outside the storable range")))
}

/// Like [`to_nanos`], but saturates; used for query bounds only.
fn clamp_nanos(ts: Timestamp) -> i64 {
    let ns = ts.as_nanosecond();
    i64::try_from(ns).unwrap_or(if ns < 0 { i64::MIN } else { i64::MAX })
}

fn from_nanos(ns: i64, column: &str) -> Result<Timestamp> {
    Timestamp::from_nanosecond(i128::from(ns))
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}
