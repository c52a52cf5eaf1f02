//! logcheck: reminders to review AWS logs, and a record that you did.
//!
//! - **storage**: durable, concurrency-safe table of check records
//! - **reminder**: interval/snooze state machine and its tokio driver
//! - **evidence**: assembles records and review notes into one document
//! - **coordinator**: connects reminders, the operator, and the store
//! - **cli**: the terminal front end

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod evidence;
pub mod model;
pub mod presenter;
pub mod reminder;
pub mod storage;
