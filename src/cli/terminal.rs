//! Terminal presenter and the interactive `watch` loop.
//!
//! Two producers feed one foreground channel: a thread reading stdin lines,
//! and a runtime task forwarding firing events. The loop consumes them in
//! arrival order, so prompts and commands never race each other.

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

use jiff::SignedDuration;
use jiff::tz::TimeZone;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::coordinator::Coordinator;
use crate::error::Error;
use crate::evidence::EvidenceDocument;
use crate::model::{CheckRecord, RecordFilter, SortOrder};
use crate::presenter::{Presenter, PromptResponse};
use crate::reminder::FiringEvent;

use super::format::{format_document, format_due, format_record_row, format_status};

const WATCH_HELP: &str = "Commands: start, stop, snooze, test, status, interval <duration>, history [n], help, quit";

/// How many records `history` shows in watch mode unless told otherwise.
const RECENT_RECORDS: usize = 10;

/// Something for the foreground to handle.
#[derive(Debug)]
pub(super) enum Signal {
    Due(FiringEvent),
    Line(String),
    /// Input is exhausted.
    Closed,
}

pub(super) struct TerminalPresenter<W> {
    out: W,
    tz: TimeZone,
    signals: Option<mpsc::Receiver<Signal>>,
    closed: bool,
}

impl TerminalPresenter<io::Stdout> {
    /// A non-interactive presenter for one-shot commands.
    pub(super) fn stdout() -> Self {
        Self::new(io::stdout(), TimeZone::system(), None)
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub(super) fn new(out: W, tz: TimeZone, signals: Option<mpsc::Receiver<Signal>>) -> Self {
        Self {
            out,
            tz,
            signals,
            closed: false,
        }
    }

    /// Blocks until the next signal. Once closed, stays closed.
    pub(super) fn next_signal(&mut self) -> Signal {
        if self.closed {
            return Signal::Closed;
        }
        let received = self.signals.as_ref().map(mpsc::Receiver::recv);
        match received {
            Some(Ok(Signal::Closed) | Err(_)) | None => {
                self.closed = true;
                Signal::Closed
            }
            Some(Ok(signal)) => signal,
        }
    }

    /// Next operator line; reminders arriving mid-prompt are folded into it.
    fn read_line(&mut self) -> Option<String> {
        loop {
            match self.next_signal() {
                Signal::Line(line) => return Some(line),
                Signal::Due(event) => {
                    info!(reason = ?event.reason, due_at = %event.due_at, "reminder fired during prompt; merged");
                    self.line("(another reminder came due; this answer covers it too)");
                }
                Signal::Closed => return None,
            }
        }
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            debug!(error = %e, "terminal write failed");
        }
    }

    fn prompt(&mut self, text: &str) {
        let written = write!(self.out, "{text}").and_then(|()| self.out.flush());
        if let Err(e) = written {
            debug!(error = %e, "terminal write failed");
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn notify_due(&mut self, event: &FiringEvent) {
        let text = format!("\x07{}", format_due(event, &self.tz));
        self.line(&text);
    }

    fn request_record_input(
        &mut self,
        _event: &FiringEvent,
        outcomes: &[String],
    ) -> PromptResponse {
        self.line("How did the review go?");
        for (i, outcome) in outcomes.iter().enumerate() {
            self.line(&format!("  {}) {outcome}", i + 1));
        }

        let outcome = loop {
            self.prompt("Outcome [number or name, s = snooze, d = dismiss]: ");
            let Some(answer) = self.read_line() else {
                return PromptResponse::Dismiss;
            };
            let answer = answer.trim();
            match answer.to_ascii_lowercase().as_str() {
                "s" | "snooze" => return PromptResponse::Snooze,
                "d" | "dismiss" => return PromptResponse::Dismiss,
                _ => {}
            }
            if let Some(outcome) = pick_outcome(answer, outcomes) {
                break outcome;
            }
            self.line(&format!("'{answer}' is not one of the listed outcomes"));
        };

        self.prompt("Notes (optional): ");
        let notes = self
            .read_line()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        PromptResponse::Record {
            timestamp: None,
            outcome,
            notes,
        }
    }

    fn render_records(&mut self, records: &[CheckRecord]) {
        if records.is_empty() {
            self.line("No check records");
            return;
        }
        for record in records {
            let row = format_record_row(record, &self.tz);
            self.line(&row);
        }
    }

    fn render_document(&mut self, document: &EvidenceDocument) {
        let text = format_document(document, &self.tz);
        self.line(&text);
    }

    fn report(&mut self, message: &str) {
        self.line(message);
    }

    fn report_error(&mut self, error: &Error) {
        eprintln!("Error: {error}");
    }
}

/// Resolves a 1-based menu number or an outcome name, ignoring case.
fn pick_outcome(answer: &str, outcomes: &[String]) -> Option<String> {
    if let Ok(n) = answer.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| outcomes.get(i)).cloned();
    }
    outcomes
        .iter()
        .find(|o| o.eq_ignore_ascii_case(answer))
        .cloned()
}

/// An operator command typed at the watch prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchCommand {
    Start,
    Stop,
    Snooze,
    Test,
    Status,
    Interval(SignedDuration),
    History(usize),
    Help,
    Quit,
}

impl WatchCommand {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        let command = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("start", None) => Self::Start,
            ("stop", None) => Self::Stop,
            ("snooze", None) => Self::Snooze,
            ("test", None) => Self::Test,
            ("status", None) => Self::Status,
            ("interval", Some(d)) => Self::Interval(
                d.parse()
                    .map_err(|_| format!("'{d}' is not a duration (try 90m or 2h)"))?,
            ),
            ("history", None) => Self::History(RECENT_RECORDS),
            ("history", Some(n)) => {
                Self::History(n.parse().map_err(|_| format!("'{n}' is not a count"))?)
            }
            ("help" | "?", None) => Self::Help,
            ("quit" | "exit" | "q", None) => Self::Quit,
            _ => return Err(format!("unrecognized command '{}'", line.trim())),
        };
        Ok(Some(command))
    }
}

/// Runs the interactive loop until `quit` or end of input.
pub(super) fn watch(
    coordinator: &mut Coordinator,
    firings: UnboundedReceiver<FiringEvent>,
    runtime: &Handle,
) {
    let (tx, rx) = mpsc::channel();
    forward_firings(runtime, firings, tx.clone());
    spawn_stdin_reader(tx);

    let mut presenter = TerminalPresenter::new(io::stdout(), TimeZone::system(), Some(rx));
    run_loop(coordinator, &mut presenter);
}

fn forward_firings(
    runtime: &Handle,
    mut firings: UnboundedReceiver<FiringEvent>,
    tx: mpsc::Sender<Signal>,
) {
    runtime.spawn(async move {
        while let Some(event) = firings.recv().await {
            if tx.send(Signal::Due(event)).is_err() {
                break;
            }
        }
    });
}

fn spawn_stdin_reader(tx: mpsc::Sender<Signal>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Signal::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            }
        }
        let _ = tx.send(Signal::Closed);
    });
}

fn run_loop<W: Write>(coordinator: &mut Coordinator, presenter: &mut TerminalPresenter<W>) {
    match coordinator.start_reminders() {
        Ok(_) => {
            let status = format_status(&coordinator.reminder_state(), &presenter.tz);
            presenter.report(&status);
        }
        Err(e) => presenter.report_error(&e),
    }
    match coordinator.check_count() {
        Ok(count) => presenter.report(&format!("{count} checks recorded so far")),
        Err(e) => presenter.report_error(&e),
    }
    presenter.report(WATCH_HELP);

    loop {
        match presenter.next_signal() {
            Signal::Due(event) => {
                let outcome = coordinator.handle_firing(&event, presenter);
                debug!(?outcome, "reminder handled");
            }
            Signal::Line(line) => match WatchCommand::parse(&line) {
                Ok(Some(WatchCommand::Quit)) => break,
                Ok(Some(command)) => execute(coordinator, presenter, command),
                Ok(None) => {}
                Err(message) => presenter.report(&message),
            },
            Signal::Closed => break,
        }
    }
    info!("watch loop finished");
}

fn execute<W: Write>(
    coordinator: &mut Coordinator,
    presenter: &mut TerminalPresenter<W>,
    command: WatchCommand,
) {
    let result = match command {
        WatchCommand::Start => coordinator.start_reminders().map(|_| ()),
        WatchCommand::Stop => {
            coordinator.stop_reminders();
            Ok(())
        }
        WatchCommand::Snooze => coordinator.snooze().map(|_| ()),
        WatchCommand::Test => {
            coordinator.trigger_now();
            Ok(())
        }
        WatchCommand::Interval(interval) => coordinator.set_interval(interval),
        WatchCommand::History(limit) => {
            let filter = RecordFilter {
                limit: Some(limit),
                ..RecordFilter::default()
            };
            match coordinator.history(&filter, SortOrder::NewestFirst) {
                Ok(records) => {
                    presenter.render_records(&records);
                    return;
                }
                Err(e) => Err(e),
            }
        }
        WatchCommand::Help => {
            presenter.report(WATCH_HELP);
            return;
        }
        WatchCommand::Status | WatchCommand::Quit => Ok(()),
    };

    match result {
        Ok(()) => {
            let status = format_status(&coordinator.reminder_state(), &presenter.tz);
            presenter.report(&status);
        }
        Err(e) => presenter.report_error(&e),
    }
}
