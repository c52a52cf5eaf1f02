//! Reminder scheduling.
//!
//! [`ReminderState`] is the deadline bookkeeping: a pure state machine that is
//! told what time it is. [`Scheduler`] drives it from a tokio task and
//! delivers [`FiringEvent`]s over an unbounded channel, so the timing flow
//! never waits on whoever is listening.

mod clock;
mod scheduler;
mod state;

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

pub use clock::{Clock, SystemClock};
pub use scheduler::Scheduler;
pub use state::{ReminderState, ReminderStatus};

#[cfg(test)]
pub use clock::{ManualClock, MonotonicClock};

/// Default time between reminders.
pub const DEFAULT_INTERVAL: SignedDuration = SignedDuration::from_secs(2 * 60 * 60);

/// Default snooze deferral.
pub const DEFAULT_SNOOZE: SignedDuration = SignedDuration::from_secs(10 * 60);

/// Upper bound on intervals and snoozes.
pub const MAX_DURATION: SignedDuration = SignedDuration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("{what} must be positive, got {value:#}")]
    NonPositive {
        what: &'static str,
        value: SignedDuration,
    },

    #[error("{what} must be at most 30 days, got {value:#}")]
    TooLong {
        what: &'static str,
        value: SignedDuration,
    },

    #[error("reminders are stopped; start them before snoozing")]
    NotRunning,
}

/// Reminder timings. Owned by the coordinator; never global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    pub interval: SignedDuration,
    pub snooze: SignedDuration,
}

impl ReminderSettings {
    pub fn validate(&self) -> Result<(), ReminderError> {
        validate_duration("reminder interval", self.interval)?;
        validate_duration("snooze duration", self.snooze)
    }
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            snooze: DEFAULT_SNOOZE,
        }
    }
}

pub(crate) fn validate_duration(
    what: &'static str,
    value: SignedDuration,
) -> Result<(), ReminderError> {
    if value.is_zero() || value.is_negative() {
        return Err(ReminderError::NonPositive { what, value });
    }
    if value > MAX_DURATION {
        return Err(ReminderError::TooLong { what, value });
    }
    Ok(())
}

/// Why a firing event was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FireReason {
    /// The regular interval elapsed.
    Interval,
    /// A snooze deadline elapsed.
    Snooze,
    /// The operator asked for a reminder now.
    Manual,
}

/// Notification that a log check is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FiringEvent {
    pub reason: FireReason,
    /// The deadline that expired. Equals `fired_at` for manual triggers.
    pub due_at: Timestamp,
    /// When the scheduler observed the deadline.
    pub fired_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_two_hours_and_ten_minutes() {
        let settings = ReminderSettings::default();
        assert_eq!(settings.interval, SignedDuration::from_hours(2));
        assert_eq!(settings.snooze, SignedDuration::from_mins(10));
        settings.validate().unwrap();
    }

    #[test]
    fn zero_and_negative_durations_are_rejected() {
        assert!(matches!(
            validate_duration("interval", SignedDuration::ZERO),
            Err(ReminderError::NonPositive { .. })
        ));
        assert!(matches!(
            validate_duration("interval", SignedDuration::from_secs(-5)),
            Err(ReminderError::NonPositive { .. })
        ));
    }

    #[test]
    fn overlong_duration_is_rejected() {
        let err = validate_duration("interval", SignedDuration::from_hours(24 * 31)).unwrap_err();
        assert!(matches!(err, ReminderError::TooLong { .. }));
    }
}
