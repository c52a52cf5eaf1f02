//! Check records: the persisted outcome of one log review.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::DateRange;

/// Store-assigned record identifier. Never reused once assigned.
pub type RecordId = i64;

/// A single log review, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: RecordId,
    /// When the review happened.
    pub timestamp: Timestamp,
    pub outcome: String,
    pub notes: Option<String>,
    /// When the row was written. Not editable.
    pub created_at: Timestamp,
}

/// Field changes for an update-by-id. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub timestamp: Option<Timestamp>,
    pub outcome: Option<String>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none() && self.outcome.is_none() && self.notes.is_none()
    }
}

/// Query constraints for listing records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub outcome: Option<String>,
    pub range: Option<DateRange>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl RecordFilter {
    pub fn outcome(outcome: impl Into<String>) -> Self {
        Self {
            outcome: Some(outcome.into()),
            ..Self::default()
        }
    }

    pub fn within(range: DateRange) -> Self {
        Self {
            range: Some(range),
            ..Self::default()
        }
    }
}

/// Listing order by check timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}
