//! What the coordinator needs from whatever the operator is looking at.
//!
//! The terminal front end in `cli` is one implementation; a desktop or web
//! shell would be another.

use jiff::Timestamp;

use crate::error::Error;
use crate::evidence::EvidenceDocument;
use crate::model::CheckRecord;
use crate::reminder::FiringEvent;

/// The operator's answer to a due reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    /// Save a check. `timestamp` of `None` means "now".
    Record {
        timestamp: Option<Timestamp>,
        outcome: String,
        notes: Option<String>,
    },
    /// Ask again after the snooze duration.
    Snooze,
    /// Ignore this reminder.
    Dismiss,
}

pub trait Presenter {
    /// Tell the operator a check is due.
    fn notify_due(&mut self, event: &FiringEvent);

    /// Ask how the check went. `outcomes` is the recognized set, in order.
    fn request_record_input(&mut self, event: &FiringEvent, outcomes: &[String])
    -> PromptResponse;

    fn render_records(&mut self, records: &[CheckRecord]);

    fn render_document(&mut self, document: &EvidenceDocument);

    fn report(&mut self, message: &str);

    fn report_error(&mut self, error: &Error);
}
