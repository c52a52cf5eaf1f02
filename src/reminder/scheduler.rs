//! Background driver for [`ReminderState`].
//!
//! A single tokio task sleeps until the governing deadline, polls the state,
//! and sends any resulting event. Operator calls mutate the shared state
//! under a mutex and wake the task so it recomputes its deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use tokio::runtime::Handle;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Clock, FireReason, FiringEvent, ReminderError, ReminderState};

/// Longest the driver sleeps before re-reading the clock. Tokio timers do not
/// advance during system suspend, so a deadline passed while asleep is seen
/// at most this long after wake.
pub(crate) const RECHECK_EVERY: Duration = Duration::from_secs(60);

struct Shared {
    state: Mutex<ReminderState>,
    wake: Notify,
    closed: AtomicBool,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ReminderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the reminder task. Created stopped.
///
/// Dropping the handle (or calling [`Scheduler::shutdown`]) ends the task;
/// no timer outlives it.
pub struct Scheduler {
    shared: Arc<Shared>,
    clock: Arc<dyn Clock>,
    events: mpsc::UnboundedSender<FiringEvent>,
    task: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawns the reminder task on `runtime`, delivering events to `events`.
    pub fn spawn(
        runtime: &Handle,
        interval: SignedDuration,
        clock: Arc<dyn Clock>,
        events: mpsc::UnboundedSender<FiringEvent>,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(ReminderState::new(interval)),
            wake: Notify::new(),
            closed: AtomicBool::new(false),
        });
        let task = runtime.spawn(drive(
            Arc::clone(&shared),
            Arc::clone(&clock),
            events.clone(),
        ));

        Self {
            shared,
            clock,
            events,
            task: Some(task),
        }
    }

    /// Starts (or restarts) the countdown. Returns the next deadline.
    pub fn start(&self, interval: SignedDuration) -> Result<Timestamp, ReminderError> {
        let next = self.shared.state().start(interval, self.clock.now())?;
        info!(%next, interval = %format_args!("{interval:#}"), "reminders started");
        self.shared.wake.notify_one();
        Ok(next)
    }

    /// Cancels future fires. Events already delivered stay delivered.
    pub fn stop(&self) {
        self.shared.state().stop();
        info!("reminders stopped");
        self.shared.wake.notify_one();
    }

    /// Defers the next fire. Returns the snooze deadline.
    pub fn snooze(&self, duration: SignedDuration) -> Result<Timestamp, ReminderError> {
        let until = self.shared.state().snooze(duration, self.clock.now())?;
        info!(%until, "reminder snoozed");
        self.shared.wake.notify_one();
        Ok(until)
    }

    pub fn set_interval(&self, interval: SignedDuration) -> Result<(), ReminderError> {
        self.shared.state().set_interval(interval, self.clock.now())?;
        debug!(interval = %format_args!("{interval:#}"), "reminder interval changed");
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Delivers a manual event now. Deadlines are untouched.
    pub fn trigger_now(&self) -> FiringEvent {
        let now = self.clock.now();
        let event = FiringEvent {
            reason: FireReason::Manual,
            due_at: now,
            fired_at: now,
        };
        deliver(&self.events, event);
        event
    }

    pub fn snapshot(&self) -> ReminderState {
        self.shared.state().clone()
    }

    /// Stops the cycle and ends the task. The returned handle resolves once
    /// the task has exited.
    pub fn shutdown(&mut self) -> Option<JoinHandle<()>> {
        self.close();
        self.task.take()
    }

    fn close(&self) {
        self.shared.state().stop();
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.close();
    }
}

async fn drive(
    shared: Arc<Shared>,
    clock: Arc<dyn Clock>,
    events: mpsc::UnboundedSender<FiringEvent>,
) {
    debug!("reminder task started");
    loop {
        if shared.closed.load(Ordering::SeqCst) {
            break;
        }

        let deadline = shared.state().deadline();
        match deadline {
            None => shared.wake.notified().await,
            Some(deadline) => {
                let wait = until(clock.now(), deadline).min(RECHECK_EVERY);
                tokio::select! {
                    () = tokio::time::sleep(wait) => {}
                    () = shared.wake.notified() => continue,
                }
            }
        }

        // Re-read: the state may have changed while we slept.
        let fired = shared.state().poll(clock.now());
        if let Some(event) = fired {
            deliver(&events, event);
        }
    }
    debug!("reminder task exited");
}

fn deliver(events: &mpsc::UnboundedSender<FiringEvent>, event: FiringEvent) {
    info!(reason = ?event.reason, due_at = %event.due_at, "reminder fired");
    if events.send(event).is_err() {
        warn!("reminder fired with no listener; event dropped");
    }
}

fn until(now: Timestamp, deadline: Timestamp) -> Duration {
    Duration::try_from(deadline.duration_since(now)).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::reminder::{MonotonicClock, ReminderStatus};

    fn hours(h: i64) -> SignedDuration {
        SignedDuration::from_hours(h)
    }

    fn mins(m: i64) -> SignedDuration {
        SignedDuration::from_mins(m)
    }

    fn spawn() -> (
        Scheduler,
        Arc<MonotonicClock>,
        mpsc::UnboundedReceiver<FiringEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let clock = Arc::new(MonotonicClock::new());
        let scheduler = Scheduler::spawn(&Handle::current(), hours(2), clock.clone(), tx);
        (scheduler, clock, rx)
    }

    /// Within a timer tick of `expected`.
    fn assert_near(actual: Timestamp, expected: Timestamp) {
        let drift = actual.duration_since(expected);
        assert!(
            !drift.is_negative() && drift < SignedDuration::from_secs(1),
            "{actual} is not within a second after {expected}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn starts_stopped_and_never_fires() {
        let (scheduler, _clock, mut rx) = spawn();

        assert_eq!(scheduler.snapshot().status(), ReminderStatus::Stopped);
        let waited = tokio::time::timeout(Duration::from_secs(24 * 3600), rx.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn start_fire_snooze_fire_scenario() {
        let (scheduler, clock, mut rx) = spawn();
        let t0 = clock.now();

        scheduler.start(hours(2)).unwrap();

        let early = tokio::time::timeout(Duration::from_secs(2 * 3600 - 1), rx.recv()).await;
        assert!(early.is_err(), "fired before the interval elapsed");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.reason, FireReason::Interval);
        assert_near(first.fired_at, t0 + hours(2));
        assert_eq!(
            scheduler.snapshot().next_fire_at(),
            Some(first.fired_at + hours(2))
        );

        // Coordinator declines: snooze from the moment of decline.
        let until = scheduler.snooze(mins(10)).unwrap();
        assert_eq!(scheduler.snapshot().status(), ReminderStatus::Snoozed);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.reason, FireReason::Snooze);
        assert_eq!(second.due_at, until);
        assert_near(second.fired_at, t0 + hours(2) + mins(10));
        assert_eq!(scheduler.snapshot().status(), ReminderStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn each_fire_resets_from_fire_time() {
        let (scheduler, _clock, mut rx) = spawn();
        scheduler.start(hours(1)).unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();

        assert_eq!(second.due_at, first.fired_at + hours(1));
        assert_eq!(
            scheduler.snapshot().next_fire_at(),
            Some(second.fired_at + hours(1))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_fire() {
        let (scheduler, _clock, mut rx) = spawn();
        scheduler.start(hours(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(1800)).await;

        scheduler.stop();

        let waited = tokio::time::timeout(Duration::from_secs(3 * 3600), rx.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_keeps_delivered_events() {
        let (scheduler, _clock, mut rx) = spawn();
        scheduler.start(hours(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(3601)).await;
        scheduler.trigger_now();

        scheduler.stop();

        assert_eq!(rx.recv().await.unwrap().reason, FireReason::Interval);
        assert_eq!(rx.recv().await.unwrap().reason, FireReason::Manual);
        assert_eq!(scheduler.snapshot().status(), ReminderStatus::Stopped);
    }

    /// Tokio time plus a wall-clock jump, as after the machine sleeps.
    struct SuspendingClock {
        tokio: MonotonicClock,
        slept: Mutex<SignedDuration>,
    }

    impl SuspendingClock {
        fn suspend(&self, by: SignedDuration) {
            *self.slept.lock().unwrap() += by;
        }
    }

    impl Clock for SuspendingClock {
        fn now(&self) -> Timestamp {
            self.tokio.now() + *self.slept.lock().unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_passed_in_suspend_fires_once_after_wake() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let clock = Arc::new(SuspendingClock {
            tokio: MonotonicClock::new(),
            slept: Mutex::new(SignedDuration::ZERO),
        });
        let scheduler = Scheduler::spawn(&Handle::current(), hours(2), clock.clone(), tx);
        let due = scheduler.start(hours(2)).unwrap();
        tokio::time::sleep(Duration::from_secs(600)).await;

        clock.suspend(hours(3));

        let fired = tokio::time::timeout(RECHECK_EVERY + Duration::from_secs(1), rx.recv())
            .await
            .expect("missed deadline not noticed after wake")
            .unwrap();
        assert_eq!(fired.reason, FireReason::Interval);
        assert_eq!(fired.due_at, due);
        assert!(fired.fired_at >= due + hours(1));
        assert_eq!(
            scheduler.snapshot().next_fire_at(),
            Some(fired.fired_at + hours(2))
        );

        let burst = tokio::time::timeout(Duration::from_secs(3600), rx.recv()).await;
        assert!(burst.is_err(), "missed deadline fired more than once");
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_now_delivers_without_moving_deadline() {
        let (scheduler, _clock, mut rx) = spawn();
        let next = scheduler.start(hours(2)).unwrap();

        let sent = scheduler.trigger_now();
        let got = rx.recv().await.unwrap();

        assert_eq!(got, sent);
        assert_eq!(got.reason, FireReason::Manual);
        assert_eq!(scheduler.snapshot().next_fire_at(), Some(next));
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_now_works_while_stopped() {
        let (scheduler, _clock, mut rx) = spawn();

        scheduler.trigger_now();

        assert_eq!(rx.recv().await.unwrap().reason, FireReason::Manual);
        assert_eq!(scheduler.snapshot().status(), ReminderStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_advancing_without_listener() {
        let (scheduler, clock, rx) = spawn();
        drop(rx);
        scheduler.start(hours(1)).unwrap();

        tokio::time::sleep(Duration::from_secs(3 * 3600 + 60)).await;

        // Three fires went nowhere; the deadline still moved into the fourth hour.
        let state = scheduler.snapshot();
        assert_eq!(state.status(), ReminderStatus::Running);
        let remaining = state.next_fire_at().unwrap().duration_since(clock.now());
        assert!(!remaining.is_negative() && remaining <= hours(1));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_ends_task() {
        let (mut scheduler, _clock, _rx) = spawn();
        scheduler.start(hours(1)).unwrap();

        let task = scheduler.shutdown().unwrap();
        task.await.unwrap();

        assert_eq!(scheduler.snapshot().status(), ReminderStatus::Stopped);
    }
}
