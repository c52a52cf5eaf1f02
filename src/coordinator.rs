//! Glue between the reminder scheduler, the record store, and the operator.
//!
//! The coordinator owns the reminder lifecycle: it creates the scheduler
//! stopped, exposes start/stop/snooze/trigger, and shuts it down on exit.
//! Reminder answers become store writes here, and failures are reported to
//! the operator rather than propagated into the timing flow.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::Error;
use crate::evidence::{self, EvidenceDocument, PackDraft, RecordSelection};
use crate::model::{CheckRecord, RecordFilter, RecordId, RecordPatch, SortOrder};
use crate::presenter::{Presenter, PromptResponse};
use crate::reminder::{Clock, FiringEvent, ReminderSettings, ReminderState, Scheduler};
use crate::storage::{RecordStore, StorageError};

/// What came of one firing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiringOutcome {
    Recorded(RecordId),
    Snoozed(Timestamp),
    Dismissed,
    /// The operator's answer could not be carried out; already reported.
    Failed,
}

pub struct Coordinator {
    store: Arc<RecordStore>,
    scheduler: Scheduler,
    settings: ReminderSettings,
    clock: Arc<dyn Clock>,
}

impl Coordinator {
    /// Builds a coordinator with a stopped scheduler running on `runtime`.
    ///
    /// Firing events arrive on the returned receiver.
    pub fn new(
        store: Arc<RecordStore>,
        settings: ReminderSettings,
        clock: Arc<dyn Clock>,
        runtime: &Handle,
    ) -> Result<(Self, mpsc::UnboundedReceiver<FiringEvent>), Error> {
        settings.validate()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::spawn(runtime, settings.interval, Arc::clone(&clock), tx);
        let coordinator = Self {
            store,
            scheduler,
            settings,
            clock,
        };
        Ok((coordinator, rx))
    }

    // ── Reminders ──

    pub fn start_reminders(&self) -> Result<Timestamp, Error> {
        Ok(self.scheduler.start(self.settings.interval)?)
    }

    pub fn stop_reminders(&self) {
        self.scheduler.stop();
    }

    /// Snoozes by the configured duration.
    pub fn snooze(&self) -> Result<Timestamp, Error> {
        Ok(self.scheduler.snooze(self.settings.snooze)?)
    }

    pub fn trigger_now(&self) -> FiringEvent {
        self.scheduler.trigger_now()
    }

    pub fn set_interval(&mut self, interval: SignedDuration) -> Result<(), Error> {
        self.scheduler.set_interval(interval)?;
        self.settings.interval = interval;
        Ok(())
    }

    pub fn reminder_state(&self) -> ReminderState {
        self.scheduler.snapshot()
    }

    pub fn settings(&self) -> ReminderSettings {
        self.settings
    }

    pub fn outcomes(&self) -> &[String] {
        self.store.outcomes().as_slice()
    }

    /// Runs the prompt-and-record flow for one due reminder.
    pub fn handle_firing(
        &self,
        event: &FiringEvent,
        presenter: &mut dyn Presenter,
    ) -> FiringOutcome {
        presenter.notify_due(event);

        match presenter.request_record_input(event, self.outcomes()) {
            PromptResponse::Record {
                timestamp,
                outcome,
                notes,
            } => match self.save_check(timestamp, &outcome, notes.as_deref()) {
                Ok(record) => {
                    presenter.report(&format!("Saved check #{} ({})", record.id, record.outcome));
                    FiringOutcome::Recorded(record.id)
                }
                Err(e) => {
                    warn!(error = %e, "reminder-triggered save failed");
                    presenter.report_error(&e);
                    FiringOutcome::Failed
                }
            },
            PromptResponse::Snooze => match self.snooze() {
                Ok(until) => {
                    presenter.report(&format!("Snoozed until {until}"));
                    FiringOutcome::Snoozed(until)
                }
                Err(e) => {
                    presenter.report_error(&e);
                    FiringOutcome::Failed
                }
            },
            PromptResponse::Dismiss => {
                info!("reminder dismissed");
                FiringOutcome::Dismissed
            }
        }
    }

    // ── Records ──

    /// Saves a check. `timestamp` of `None` means now; blank notes are dropped.
    pub fn save_check(
        &self,
        timestamp: Option<Timestamp>,
        outcome: &str,
        notes: Option<&str>,
    ) -> Result<CheckRecord, Error> {
        let timestamp = timestamp.unwrap_or_else(|| self.clock.now());
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        let id = self.store.create(timestamp, outcome, notes)?;
        Ok(self.store.get(id)?)
    }

    pub fn history(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> Result<Vec<CheckRecord>, Error> {
        Ok(self.store.list(filter, order)?)
    }

    pub fn record(&self, id: RecordId) -> Result<CheckRecord, Error> {
        Ok(self.store.get(id)?)
    }

    pub fn edit(&self, id: RecordId, patch: &RecordPatch) -> Result<CheckRecord, Error> {
        Ok(self.store.update(id, patch)?)
    }

    pub fn delete(&self, id: RecordId) -> Result<(), Error> {
        Ok(self.store.delete(id)?)
    }

    pub fn purge_before(&self, cutoff: Timestamp) -> Result<usize, Error> {
        Ok(self.store.purge_before(cutoff)?)
    }

    pub fn check_count(&self) -> Result<u64, Error> {
        Ok(self.store.count()?)
    }

    // ── Evidence ──

    /// Loads the records `selection` could admit and assembles the pack.
    pub fn build_pack(
        &self,
        draft: &PackDraft,
        selection: &RecordSelection,
    ) -> Result<EvidenceDocument, Error> {
        let candidates = match selection {
            RecordSelection::All => self
                .store
                .list(&RecordFilter::default(), SortOrder::OldestFirst)?,
            RecordSelection::Range { range } => self
                .store
                .list(&RecordFilter::within(*range), SortOrder::OldestFirst)?,
            RecordSelection::Ids { ids } => {
                let mut found = Vec::with_capacity(ids.len());
                for id in ids {
                    match self.store.get(*id) {
                        Ok(record) => found.push(record),
                        Err(StorageError::RecordNotFound(_)) => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                found
            }
        };
        Ok(evidence::assemble(draft, &candidates, selection))
    }

    /// Stops reminders and ends the scheduler task. The returned handle
    /// resolves once no timer remains.
    pub fn shutdown(mut self) -> Option<JoinHandle<()>> {
        info!("coordinator shutting down");
        self.scheduler.shutdown()
    }
}
