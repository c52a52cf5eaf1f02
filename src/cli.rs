//! CLI interface for logcheck.
//!
//! One-shot commands record, query, and edit check records or assemble an
//! evidence pack, then exit. `watch` stays in the foreground, nags at the
//! configured interval, and turns each answered reminder into a record.

mod format;
mod terminal;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use jiff::SignedDuration;
use jiff::tz::TimeZone;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::Error;
use crate::evidence::{EvidenceDocument, PackDraft, RecordSelection};
use crate::model::{
    DateRange, DayEdge, InputError, RecordFilter, RecordId, RecordPatch, SortOrder,
    parse_timestamp,
};
use crate::presenter::Presenter;
use crate::reminder::{FiringEvent, SystemClock};
use crate::storage::RecordStore;

use format::format_record_detail;
use terminal::TerminalPresenter;

/// logcheck: remember to review your AWS logs, and prove that you did.
#[derive(Debug, Parser)]
#[command(name = "logcheck", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: a week of log reviews
  1. logcheck watch
     → reminds you every 2h; answer with an outcome and optional notes
  2. logcheck record "Issues Found" --notes "403 spike from 10.0.4.7"
  3. logcheck history --since 2024-05-01
  4. logcheck pack review.toml --since 2024-05-01 --until 2024-05-07 --out pack.md
  5. logcheck pack review.toml --json --out pack.json && logcheck verify pack.json

Times:
  --at, --since, --until and --before take RFC 3339 (2024-05-01T09:00:00Z),
  local date-times (2024-05-01 09:00), or dates (2024-05-01)."#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a completed log review. Prints the record ID.
    Record {
        /// One of the configured outcomes (see `logcheck outcomes`).
        outcome: String,

        /// Free-text notes.
        #[arg(long)]
        notes: Option<String>,

        /// When the review happened. Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },

    /// List recorded checks, newest first.
    History {
        /// Only checks with this outcome.
        #[arg(long)]
        outcome: Option<String>,

        /// Only checks at or after this time.
        #[arg(long)]
        since: Option<String>,

        /// Only checks at or before this time. A bare date covers the whole day.
        #[arg(long)]
        until: Option<String>,

        /// Show at most this many checks.
        #[arg(long)]
        limit: Option<usize>,

        /// List oldest first instead.
        #[arg(long)]
        oldest_first: bool,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show one recorded check.
    Show { id: RecordId },

    /// Change a recorded check. Unspecified fields are left alone.
    Edit {
        id: RecordId,

        #[arg(long)]
        outcome: Option<String>,

        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        /// Remove the notes.
        #[arg(long)]
        clear_notes: bool,

        /// Correct when the review happened.
        #[arg(long)]
        at: Option<String>,
    },

    /// Delete a recorded check.
    Delete { id: RecordId },

    /// Delete every check recorded before a time. Prints how many went.
    Purge {
        #[arg(long)]
        before: String,
    },

    /// List the configured outcomes.
    Outcomes,

    /// Assemble an evidence pack from a TOML draft and recorded checks.
    ///
    /// Covers every check unless `--ids` or a time range narrows it.
    /// The Markdown (or `--json`) document goes to `--out` or stdout.
    Pack {
        /// Draft file: metadata, sections, and sign-off.
        draft: PathBuf,

        /// Include exactly these record IDs (comma-separated).
        #[arg(long, value_delimiter = ',', conflicts_with_all = ["since", "until"])]
        ids: Vec<RecordId>,

        #[arg(long)]
        since: Option<String>,

        #[arg(long)]
        until: Option<String>,

        /// Emit the document as JSON.
        #[arg(long)]
        json: bool,

        /// Write the document to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Check that an evidence pack exported with `--json` is unaltered.
    Verify {
        /// The exported JSON document.
        document: PathBuf,
    },

    /// Run the reminder loop in the foreground.
    ///
    /// Reminders start immediately. Type `help` for commands.
    Watch {
        /// Time between reminders, e.g. `2h` or `90m`. Overrides config.
        #[arg(long)]
        interval: Option<SignedDuration>,

        /// How long `snooze` defers a reminder. Overrides config.
        #[arg(long)]
        snooze: Option<SignedDuration>,
    },
}

impl Command {
    /// Whether the command reads `~/.logcheck/config.toml`. `verify` only
    /// looks at the document it is given.
    pub fn uses_config(&self) -> bool {
        !matches!(self, Self::Verify { .. })
    }
}

/// Run one parsed command against the configured store.
pub fn run(cli: Cli, config: &Config, runtime: &Handle) -> Result<(), Error> {
    if let Command::Verify { document } = &cli.command {
        return cmd_verify(document);
    }

    let mut settings = config.reminder_settings();
    if let Command::Watch { interval, snooze } = &cli.command {
        settings.interval = interval.unwrap_or(settings.interval);
        settings.snooze = snooze.unwrap_or(settings.snooze);
    }

    let store = RecordStore::open(config.database_path()?, config.outcomes.clone())?;
    info!(path = %store.path().display(), "record store ready");
    let (mut coordinator, firings) = Coordinator::new(
        Arc::new(store),
        settings,
        Arc::new(SystemClock),
        runtime,
    )?;
    let result = dispatch(cli.command, &mut coordinator, firings, runtime);

    if let Some(task) = coordinator.shutdown()
        && let Err(e) = runtime.block_on(task)
    {
        warn!(error = %e, "reminder task did not exit cleanly");
    }

    result
}

fn dispatch(
    command: Command,
    coordinator: &mut Coordinator,
    firings: UnboundedReceiver<FiringEvent>,
    runtime: &Handle,
) -> Result<(), Error> {
    let mut presenter = TerminalPresenter::stdout();

    match command {
        Command::Record { outcome, notes, at } => {
            cmd_record(coordinator, &outcome, notes.as_deref(), at.as_deref())
        }
        Command::History {
            outcome,
            since,
            until,
            limit,
            oldest_first,
            json,
        } => {
            let filter = RecordFilter {
                outcome,
                range: parse_range(since.as_deref(), until.as_deref())?,
                limit,
                offset: 0,
            };
            let order = if oldest_first {
                SortOrder::OldestFirst
            } else {
                SortOrder::NewestFirst
            };
            cmd_history(coordinator, &mut presenter, &filter, order, json)
        }
        Command::Show { id } => {
            let record = coordinator.record(id)?;
            println!("{}", format_record_detail(&record, &TimeZone::system()));
            Ok(())
        }
        Command::Edit {
            id,
            outcome,
            notes,
            clear_notes,
            at,
        } => {
            let patch = RecordPatch {
                timestamp: at
                    .as_deref()
                    .map(|s| parse_timestamp(s, DayEdge::Start))
                    .transpose()?,
                outcome,
                notes: if clear_notes { Some(None) } else { notes.map(Some) },
            };
            cmd_edit(coordinator, id, &patch)
        }
        Command::Delete { id } => {
            coordinator.delete(id)?;
            eprintln!("Deleted check #{id}");
            Ok(())
        }
        Command::Purge { before } => {
            let cutoff = parse_timestamp(&before, DayEdge::Start)?;
            let purged = coordinator.purge_before(cutoff)?;
            println!("{purged}");
            Ok(())
        }
        Command::Outcomes => {
            for outcome in coordinator.outcomes() {
                println!("{outcome}");
            }
            Ok(())
        }
        Command::Pack {
            draft,
            ids,
            since,
            until,
            json,
            out,
        } => {
            let ranged = since.is_some() || until.is_some();
            let selection = match (ids.is_empty(), ranged) {
                (false, _) => RecordSelection::ids(ids)?,
                (true, true) => RecordSelection::range(
                    parse_bound(since.as_deref(), DayEdge::Start)?,
                    parse_bound(until.as_deref(), DayEdge::End)?,
                )?,
                (true, false) => RecordSelection::All,
            };
            cmd_pack(coordinator, &mut presenter, &draft, &selection, json, out.as_deref())
        }
        Command::Verify { document } => cmd_verify(&document),
        Command::Watch { .. } => {
            terminal::watch(coordinator, firings, runtime);
            Ok(())
        }
    }
}

/// Range from optional `--since`/`--until`; `None` when neither is given.
fn parse_range(since: Option<&str>, until: Option<&str>) -> Result<Option<DateRange>, Error> {
    if since.is_none() && until.is_none() {
        return Ok(None);
    }
    let start = parse_bound(since, DayEdge::Start)?;
    let end = parse_bound(until, DayEdge::End)?;
    Ok(Some(DateRange::bounded(start, end)?))
}

fn parse_bound(input: Option<&str>, edge: DayEdge) -> Result<Option<jiff::Timestamp>, Error> {
    input
        .map(|s| parse_timestamp(s, edge))
        .transpose()
        .map_err(Error::from)
}

fn cmd_record(
    coordinator: &Coordinator,
    outcome: &str,
    notes: Option<&str>,
    at: Option<&str>,
) -> Result<(), Error> {
    let timestamp = at.map(|s| parse_timestamp(s, DayEdge::Start)).transpose()?;
    let record = coordinator.save_check(timestamp, outcome, notes)?;
    println!("{}", record.id);
    Ok(())
}

fn cmd_history(
    coordinator: &Coordinator,
    presenter: &mut dyn Presenter,
    filter: &RecordFilter,
    order: SortOrder,
    json: bool,
) -> Result<(), Error> {
    let records = coordinator.history(filter, order)?;
    if json {
        let json = serde_json::to_string_pretty(&records).map_err(std::io::Error::from)?;
        println!("{json}");
    } else {
        presenter.render_records(&records);
    }
    Ok(())
}

fn cmd_edit(coordinator: &Coordinator, id: RecordId, patch: &RecordPatch) -> Result<(), Error> {
    if patch.is_empty() {
        return Err(InputError::EmptyEdit.into());
    }
    let record = coordinator.edit(id, patch)?;
    println!("{}", format_record_detail(&record, &TimeZone::system()));
    Ok(())
}

fn cmd_pack(
    coordinator: &Coordinator,
    presenter: &mut dyn Presenter,
    draft_path: &Path,
    selection: &RecordSelection,
    json: bool,
    out: Option<&Path>,
) -> Result<(), Error> {
    let source = fs::read_to_string(draft_path)
        .map_err(|e| InputError::Draft(format!("{}: {e}", draft_path.display())))?;
    let draft = PackDraft::from_toml(&source)?;
    let document = coordinator.build_pack(&draft, selection)?;

    if !document.missing_ids.is_empty() {
        warn!(missing = ?document.missing_ids, "selected records not found");
    }

    match (out, json) {
        (None, false) => presenter.render_document(&document),
        (None, true) => {
            let json = serde_json::to_string_pretty(&document).map_err(std::io::Error::from)?;
            println!("{json}");
        }
        (Some(path), json) => {
            let contents = if json {
                serde_json::to_string_pretty(&document).map_err(std::io::Error::from)?
            } else {
                format::format_document(&document, &TimeZone::system())
            };
            fs::write(path, contents)?;
            eprintln!(
                "Evidence pack ({} records) → {}",
                document.records.len(),
                path.display()
            );
        }
    }

    Ok(())
}

/// Fails unless the document's fingerprint matches its contents.
fn cmd_verify(path: &Path) -> Result<(), Error> {
    let source = fs::read_to_string(path)
        .map_err(|e| InputError::Document(format!("{}: {e}", path.display())))?;
    let document = EvidenceDocument::from_json(&source)?;
    if !document.fingerprint_matches() {
        return Err(InputError::FingerprintMismatch.into());
    }
    println!(
        "Fingerprint OK: {} records, sha256:{}",
        document.records.len(),
        document.fingerprint
    );
    Ok(())
}
