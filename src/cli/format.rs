//! Output formatting for CLI display.

use std::fmt::Write as _;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::evidence::{Entry, EvidenceDocument, ExecutiveSummary, RecordSelection, Section};
use crate::model::CheckRecord;
use crate::reminder::{FireReason, FiringEvent, ReminderState, ReminderStatus};

pub(super) fn format_time(ts: Timestamp, tz: &TimeZone) -> String {
    ts.to_zoned(tz.clone()).strftime("%Y-%m-%d %H:%M").to_string()
}

/// One line per record, for `history`.
pub(super) fn format_record_row(record: &CheckRecord, tz: &TimeZone) -> String {
    let mut row = format!(
        "{:>4}  {}  {}",
        record.id,
        format_time(record.timestamp, tz),
        record.outcome
    );
    if let Some(notes) = &record.notes {
        row.push_str("  ");
        row.push_str(&single_line(notes));
    }
    row
}

/// Every field of one record, for `show`.
pub(super) fn format_record_detail(record: &CheckRecord, tz: &TimeZone) -> String {
    let mut out = format!("Record #{}\n", record.id);
    let _ = writeln!(out, "  Checked:  {}", format_time(record.timestamp, tz));
    let _ = writeln!(out, "  Outcome:  {}", record.outcome);
    if let Some(notes) = &record.notes {
        let _ = writeln!(out, "  Notes:    {notes}");
    }
    let _ = write!(out, "  Saved:    {}", format_time(record.created_at, tz));
    out
}

pub(super) fn format_fire_reason(reason: FireReason) -> &'static str {
    match reason {
        FireReason::Interval => "scheduled",
        FireReason::Snooze => "snoozed",
        FireReason::Manual => "test",
    }
}

pub(super) fn format_due(event: &FiringEvent, tz: &TimeZone) -> String {
    format!(
        "Log review due ({}, {})",
        format_fire_reason(event.reason),
        format_time(event.fired_at, tz)
    )
}

pub(super) fn format_status(state: &ReminderState, tz: &TimeZone) -> String {
    let interval = state.interval();
    match (state.status(), state.next_fire_at(), state.snoozed_until()) {
        (ReminderStatus::Running, Some(next), _) => format!(
            "Reminders running every {interval:#}; next check due {}",
            format_time(next, tz)
        ),
        (ReminderStatus::Snoozed, _, Some(until)) => format!(
            "Reminders snoozed until {} (every {interval:#})",
            format_time(until, tz)
        ),
        _ => format!("Reminders stopped (interval {interval:#})"),
    }
}

/// The assembled pack as Markdown, ready to paste into a ticket or chat.
pub(super) fn format_document(doc: &EvidenceDocument, tz: &TimeZone) -> String {
    let mut out = format!("*{}*\n---\n", doc.title);
    let meta = &doc.metadata;

    for (label, value) in [
        ("Checker", meta.checker.as_str()),
        ("Environment", meta.environment.as_str()),
        ("Account", meta.account.as_str()),
    ] {
        if !value.is_empty() {
            let _ = writeln!(out, "*{label}:* {value}");
        }
    }
    match (meta.period_start, meta.period_end) {
        (Some(start), Some(end)) => {
            let _ = writeln!(out, "*Period:* {start} to {end}");
        }
        (Some(start), None) => {
            let _ = writeln!(out, "*Period:* from {start}");
        }
        (None, Some(end)) => {
            let _ = writeln!(out, "*Period:* until {end}");
        }
        (None, None) => {}
    }
    if let Some(evidence) = &meta.evidence {
        let _ = writeln!(out, "*Evidence:* {evidence}");
    }
    if !meta.summary.is_empty() {
        format_summary(&mut out, &meta.summary);
    }
    if !meta.systems_scanned.is_empty() {
        out.push_str("\n*Systems Scanned:*\n");
        for system in &meta.systems_scanned {
            let _ = writeln!(out, "- {}", single_line(system));
        }
    }
    if !meta.log_sources.is_empty() {
        out.push_str("\n*Log Sources Reviewed:*\n");
        for source in &meta.log_sources {
            if source.detail.is_empty() {
                let _ = writeln!(out, "- {}", source.name);
            } else {
                let _ = writeln!(out, "- {}: {}", source.name, source.detail);
            }
        }
    }

    let _ = writeln!(
        out,
        "\n---\n*Check Records* ({})",
        describe_selection(&doc.selection, tz)
    );
    if doc.records.is_empty() {
        out.push_str("No check records in scope.\n");
    } else {
        out.push_str("| # | Checked | Outcome | Notes |\n");
        out.push_str("| :--- | :--- | :--- | :--- |\n");
        for record in &doc.records {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                record.id,
                format_time(record.timestamp, tz),
                table_cell(&record.outcome),
                record.notes.as_deref().map_or(String::new(), table_cell),
            );
        }
        let tally = doc
            .tally
            .iter()
            .map(|t| format!("{} {}", t.outcome, t.count))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "*Summary:* {tally}");
    }
    if !doc.missing_ids.is_empty() {
        let missing = doc
            .missing_ids
            .iter()
            .map(|id| format!("#{id}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "*Not found:* {missing}");
    }

    if let Some(analysis) = meta.analysis.as_deref().map(str::trim_end) {
        let _ = writeln!(out, "\n---\n*Evidence & Analysis*\n{analysis}");
    }

    for section in &doc.sections {
        out.push_str("\n---\n");
        format_section(&mut out, section);
    }

    out.push_str("\n---\n*Sign-off*\n");
    let signoff = &doc.signoff;
    if !signoff.checked_by.is_empty() {
        let _ = writeln!(out, "*Checked by:* {}", signoff.checked_by);
    }
    if !signoff.reviewed_by.is_empty() {
        let _ = writeln!(out, "*Reviewed by:* {}", signoff.reviewed_by);
    }
    if let Some(date) = signoff.completed_on {
        let _ = writeln!(out, "*Completed:* {date}");
    }

    let _ = write!(out, "\nFingerprint: sha256:{}", doc.fingerprint);
    out
}

fn format_summary(out: &mut String, summary: &ExecutiveSummary) {
    out.push_str("\n*Executive Summary*\n");
    if !summary.analyst.is_empty() {
        let _ = writeln!(out, "*Analyst:* {}", summary.analyst);
    }
    if let Some(reason) = &summary.reason {
        let _ = writeln!(out, "*Reason for Scan:* {}", single_line(reason));
    }
    if let Some(finding) = summary.overall_finding {
        let _ = writeln!(out, "*Overall Finding:* {finding}");
    }
    if let Some(criticality) = summary.criticality {
        let _ = writeln!(out, "*Criticality:* {criticality}");
    }
    if let Some(takeaway) = &summary.key_takeaway {
        out.push('\n');
        for line in takeaway.lines() {
            let _ = writeln!(out, "> {line}");
        }
    }
}

fn format_section(out: &mut String, section: &Section) {
    let _ = writeln!(out, "*{}*", section.title);
    if section.entries().is_empty() {
        let _ = writeln!(out, "{}", section.empty_text.as_deref().unwrap_or("None"));
        return;
    }
    if section.entries().iter().any(Entry::is_detailed) {
        format_entry_table(out, section.entries());
        return;
    }
    for entry in section.entries() {
        match entry.due {
            Some(due) => {
                let _ = writeln!(out, "- {} (due {due})", single_line(&entry.description));
            }
            None => {
                let _ = writeln!(out, "- {}", single_line(&entry.description));
            }
        }
    }
}

/// One column per detail that any entry carries; gaps read `N/A`.
fn format_entry_table(out: &mut String, entries: &[Entry]) {
    type Cell = fn(&Entry) -> Option<String>;
    let columns: [(&str, Cell); 7] = [
        ("Priority", |e| e.priority.map(|p| p.to_string())),
        ("Timestamp (UTC)", |e| {
            e.observed_at.map(|t| format_time(t, &TimeZone::UTC))
        }),
        ("Severity", |e| e.severity.map(|s| s.to_string())),
        ("Description", |e| Some(e.description.clone())),
        ("Source", |e| e.source.clone()),
        ("Owner", |e| e.owner.clone()),
        ("Due", |e| e.due.map(|d| d.to_string())),
    ];
    let shown: Vec<(&str, Cell)> = columns
        .into_iter()
        .filter(|(_, cell)| entries.iter().any(|e| cell(e).is_some()))
        .collect();

    let header: Vec<&str> = shown.iter().map(|(name, _)| *name).collect();
    let _ = writeln!(out, "| {} |", header.join(" | "));
    let _ = writeln!(out, "|{}", " :--- |".repeat(shown.len()));
    for entry in entries {
        let cells: Vec<String> = shown
            .iter()
            .map(|(_, cell)| {
                cell(entry)
                    .filter(|c| !c.trim().is_empty())
                    .map_or_else(|| "N/A".to_string(), |c| table_cell(&c))
            })
            .collect();
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
}

fn describe_selection(selection: &RecordSelection, tz: &TimeZone) -> String {
    match selection {
        RecordSelection::All => "all records".to_string(),
        RecordSelection::Ids { ids } => {
            let ids = ids
                .iter()
                .map(|id| format!("#{id}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("records {ids}")
        }
        RecordSelection::Range { range } => {
            let open_start = range.start() == Timestamp::MIN;
            let open_end = range.end() == Timestamp::MAX;
            match (open_start, open_end) {
                (true, true) => "all time".to_string(),
                (true, false) => format!("until {}", format_time(range.end(), tz)),
                (false, true) => format!("since {}", format_time(range.start(), tz)),
                (false, false) => format!(
                    "{} to {}",
                    format_time(range.start(), tz),
                    format_time(range.end(), tz)
                ),
            }
        }
    }
}

fn single_line(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(" ")
}

fn table_cell(text: &str) -> String {
    single_line(text).replace('|', "\\|")
}
