//! Core data model for logcheck.
//!
//! Check records are the only persisted type. Everything else here describes
//! how records are addressed: outcome sets, filters, date ranges, and the
//! parsing rules for operator-supplied times.

mod outcome;
mod record;
mod time;

pub use outcome::OutcomeSet;
pub use record::{CheckRecord, RecordFilter, RecordId, RecordPatch, SortOrder};
pub use time::{DateRange, DayEdge, parse_timestamp, parse_timestamp_in};

/// Malformed operator input.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("unrecognized time '{0}': use RFC 3339, 'YYYY-MM-DD HH:MM', or 'YYYY-MM-DD'")]
    Timestamp(String),

    #[error("'{0}' does not exist in the local time zone")]
    LocalTime(String),

    #[error("range start {start} is after range end {end}")]
    InvertedRange {
        start: jiff::Timestamp,
        end: jiff::Timestamp,
    },

    #[error("record selection names no ids")]
    EmptySelection,

    #[error("invalid evidence pack draft: {0}")]
    Draft(String),

    #[error("nothing to change: give at least one field to edit")]
    EmptyEdit,

    #[error("unreadable evidence document: {0}")]
    Document(String),

    #[error("evidence document fingerprint does not match its contents")]
    FingerprintMismatch,
}
