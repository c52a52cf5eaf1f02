//! Deadline bookkeeping for reminders.

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

use super::{FireReason, FiringEvent, ReminderError, validate_duration};

/// Where the reminder cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderStatus {
    Stopped,
    Running,
    Snoozed,
}

/// Reminder cycle state. Every transition is given the current time.
///
/// While a snooze is set it is the only deadline that governs the next fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderState {
    enabled: bool,
    interval: SignedDuration,
    next_fire_at: Option<Timestamp>,
    snoozed_until: Option<Timestamp>,
}

impl ReminderState {
    /// A stopped cycle with the given interval.
    pub fn new(interval: SignedDuration) -> Self {
        Self {
            enabled: false,
            interval,
            next_fire_at: None,
            snoozed_until: None,
        }
    }

    pub fn status(&self) -> ReminderStatus {
        match (self.enabled, self.snoozed_until) {
            (false, _) => ReminderStatus::Stopped,
            (true, Some(_)) => ReminderStatus::Snoozed,
            (true, None) => ReminderStatus::Running,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> SignedDuration {
        self.interval
    }

    pub fn next_fire_at(&self) -> Option<Timestamp> {
        self.next_fire_at
    }

    pub fn snoozed_until(&self) -> Option<Timestamp> {
        self.snoozed_until
    }

    /// The deadline that governs the next fire, if the cycle is enabled.
    pub fn deadline(&self) -> Option<Timestamp> {
        if !self.enabled {
            return None;
        }
        self.snoozed_until.or(self.next_fire_at)
    }

    /// Starts (or restarts) the countdown: the next fire is `now + interval`.
    ///
    /// Restarting clears any snooze.
    pub fn start(&mut self, interval: SignedDuration, now: Timestamp) -> Result<Timestamp, ReminderError> {
        validate_duration("reminder interval", interval)?;
        let next = now + interval;
        self.enabled = true;
        self.interval = interval;
        self.next_fire_at = Some(next);
        self.snoozed_until = None;
        Ok(next)
    }

    /// Cancels any pending fire. Stopping a stopped cycle is a no-op.
    pub fn stop(&mut self) {
        self.enabled = false;
        self.next_fire_at = None;
        self.snoozed_until = None;
    }

    /// Defers the next fire to `now + duration`, replacing any earlier snooze.
    pub fn snooze(&mut self, duration: SignedDuration, now: Timestamp) -> Result<Timestamp, ReminderError> {
        validate_duration("snooze duration", duration)?;
        if !self.enabled {
            return Err(ReminderError::NotRunning);
        }
        let until = now + duration;
        self.snoozed_until = Some(until);
        Ok(until)
    }

    /// Changes the interval. A running cycle restarts its countdown from `now`;
    /// a pending snooze is left in place.
    pub fn set_interval(&mut self, interval: SignedDuration, now: Timestamp) -> Result<(), ReminderError> {
        validate_duration("reminder interval", interval)?;
        self.interval = interval;
        if self.enabled {
            self.next_fire_at = Some(now + interval);
        }
        Ok(())
    }

    /// Fires if the governing deadline has passed.
    ///
    /// However late `now` is, at most one event results, and the next
    /// deadline is measured from `now` rather than from the missed one.
    pub fn poll(&mut self, now: Timestamp) -> Option<FiringEvent> {
        let due_at = self.deadline()?;
        if now < due_at {
            return None;
        }

        let reason = if self.snoozed_until.take().is_some() {
            FireReason::Snooze
        } else {
            FireReason::Interval
        };
        self.next_fire_at = Some(now + self.interval);

        Some(FiringEvent {
            reason,
            due_at,
            fired_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> Timestamp {
        Timestamp::new(1_714_550_400, 0).unwrap()
    }

    fn hours(h: i64) -> SignedDuration {
        SignedDuration::from_hours(h)
    }

    fn mins(m: i64) -> SignedDuration {
        SignedDuration::from_mins(m)
    }

    #[test]
    fn new_state_is_stopped_with_no_deadline() {
        let state = ReminderState::new(hours(2));

        assert_eq!(state.status(), ReminderStatus::Stopped);
        assert_eq!(state.deadline(), None);
    }

    #[test]
    fn start_sets_deadline_one_interval_out() {
        let mut state = ReminderState::new(hours(2));
        let next = state.start(hours(2), t0()).unwrap();

        assert_eq!(next, t0() + hours(2));
        assert_eq!(state.status(), ReminderStatus::Running);
        assert_eq!(state.deadline(), Some(next));
    }

    #[test]
    fn start_rejects_non_positive_interval() {
        let mut state = ReminderState::new(hours(2));
        let err = state.start(SignedDuration::ZERO, t0()).unwrap_err();

        assert!(matches!(err, ReminderError::NonPositive { .. }));
        assert_eq!(state.status(), ReminderStatus::Stopped);
    }

    #[test]
    fn no_fire_before_deadline() {
        let mut state = ReminderState::new(hours(2));
        state.start(hours(2), t0()).unwrap();

        let just_before = t0() + hours(2) - SignedDuration::from_nanos(1);
        assert_eq!(state.poll(just_before), None);
    }

    #[test]
    fn late_fire_reschedules_from_fire_time() {
        let mut state = ReminderState::new(hours(2));
        state.start(hours(2), t0()).unwrap();

        let late = t0() + hours(2) + mins(37);
        let event = state.poll(late).unwrap();

        assert_eq!(event.reason, FireReason::Interval);
        assert_eq!(event.due_at, t0() + hours(2));
        assert_eq!(event.fired_at, late);
        assert_eq!(state.next_fire_at(), Some(late + hours(2)));
        assert_eq!(state.status(), ReminderStatus::Running);
    }

    #[test]
    fn overdue_deadline_fires_once() {
        let mut state = ReminderState::new(hours(1));
        state.start(hours(1), t0()).unwrap();

        let much_later = t0() + hours(5);
        assert!(state.poll(much_later).is_some());
        assert_eq!(state.poll(much_later), None);
        assert_eq!(state.next_fire_at(), Some(much_later + hours(1)));
    }

    #[test]
    fn snooze_fires_once_then_returns_to_interval() {
        let mut state = ReminderState::new(hours(2));
        state.start(hours(2), t0()).unwrap();
        let first = state.poll(t0() + hours(2)).unwrap();

        let until = state.snooze(mins(10), first.fired_at).unwrap();
        assert_eq!(state.status(), ReminderStatus::Snoozed);
        assert_eq!(state.deadline(), Some(t0() + hours(2) + mins(10)));
        assert_eq!(state.poll(until - SignedDuration::from_secs(1)), None);

        let second = state.poll(until).unwrap();
        assert_eq!(second.reason, FireReason::Snooze);
        assert_eq!(second.fired_at, t0() + hours(2) + mins(10));
        assert_eq!(state.status(), ReminderStatus::Running);
        assert_eq!(state.next_fire_at(), Some(until + hours(2)));
    }

    #[test]
    fn second_snooze_replaces_first() {
        let mut state = ReminderState::new(hours(2));
        state.start(hours(2), t0()).unwrap();

        state.snooze(mins(10), t0()).unwrap();
        let later = t0() + mins(3);
        let until = state.snooze(mins(4), later).unwrap();

        assert_eq!(until, later + mins(4));
        assert_eq!(state.snoozed_until(), Some(t0() + mins(7)));
        assert_eq!(state.deadline(), Some(t0() + mins(7)));
    }

    #[test]
    fn snooze_requires_running_cycle() {
        let mut state = ReminderState::new(hours(2));
        let err = state.snooze(mins(10), t0()).unwrap_err();

        assert!(matches!(err, ReminderError::NotRunning));
    }

    #[test]
    fn stop_cancels_everything() {
        let mut state = ReminderState::new(hours(2));
        state.start(hours(2), t0()).unwrap();
        state.snooze(mins(10), t0()).unwrap();

        state.stop();

        assert_eq!(state.status(), ReminderStatus::Stopped);
        assert_eq!(state.poll(t0() + hours(10)), None);
    }

    #[test]
    fn restart_clears_snooze() {
        let mut state = ReminderState::new(hours(2));
        state.start(hours(2), t0()).unwrap();
        state.snooze(mins(10), t0()).unwrap();

        state.start(hours(1), t0() + mins(1)).unwrap();

        assert_eq!(state.status(), ReminderStatus::Running);
        assert_eq!(state.deadline(), Some(t0() + mins(1) + hours(1)));
    }

    #[test]
    fn interval_change_recomputes_running_deadline() {
        let mut state = ReminderState::new(hours(2));
        state.start(hours(2), t0()).unwrap();

        state.set_interval(hours(1), t0() + mins(30)).unwrap();

        assert_eq!(state.interval(), hours(1));
        assert_eq!(state.next_fire_at(), Some(t0() + mins(90)));
    }

    #[test]
    fn interval_change_while_stopped_sets_no_deadline() {
        let mut state = ReminderState::new(hours(2));
        state.set_interval(hours(3), t0()).unwrap();

        assert_eq!(state.interval(), hours(3));
        assert_eq!(state.deadline(), None);
    }
}
