//! Time sources for the scheduler.

use jiff::Timestamp;
#[cfg(test)]
use jiff::SignedDuration;
#[cfg(test)]
use tokio::time::Instant;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The system wall clock.
///
/// Deadlines and record timestamps are wall times, so time spent in system
/// suspend counts toward the next reminder. The driver re-reads this clock
/// at least once a minute.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Wall time anchored once, then advanced by tokio's clock, so a paused
/// runtime pauses it too.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Timestamp,
    started: Instant,
}

#[cfg(test)]
impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Timestamp::now(),
            started: Instant::now(),
        }
    }
}

#[cfg(test)]
impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let elapsed = SignedDuration::try_from(self.started.elapsed()).unwrap();
        self.origin + elapsed
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock(std::sync::Mutex<Timestamp>);

#[cfg(test)]
impl ManualClock {
    pub fn at(start: Timestamp) -> Self {
        Self(std::sync::Mutex::new(start))
    }

    pub fn advance(&self, by: SignedDuration) {
        let mut now = self.0.lock().unwrap();
        *now = now.checked_add(by).unwrap();
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.0.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn monotonic_clock_follows_tokio_time() {
        let clock = MonotonicClock::new();
        let before = clock.now();

        tokio::time::advance(Duration::from_secs(90)).await;

        assert_eq!(clock.now().duration_since(before), SignedDuration::from_secs(90));
    }

    #[test]
    fn system_clock_reads_wall_time() {
        let before = Timestamp::now();
        let now = SystemClock.now();
        let after = Timestamp::now();

        assert!(before <= now && now <= after);
    }

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let clock = ManualClock::at(Timestamp::UNIX_EPOCH);
        assert_eq!(clock.now(), Timestamp::UNIX_EPOCH);

        clock.advance(SignedDuration::from_mins(5));
        assert_eq!(clock.now(), Timestamp::new(300, 0).unwrap());
    }
}
