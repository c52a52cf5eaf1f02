//! Evidence packs: review metadata, free-form sections, and the check
//! records they cover, assembled into one shareable document.
//!
//! A [`PackDraft`] is edited in memory (or loaded from TOML) and handed to
//! [`assemble`] together with candidate records. Assembly never touches the
//! store and never fails; rendering and export belong to the caller.

mod assemble;
mod rating;

use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::model::{CheckRecord, DateRange, InputError, RecordId};

pub use assemble::{EvidenceDocument, OutcomeCount, assemble};
pub use rating::{Criticality, OverallFinding, Priority, Severity};

/// Title shared by every assembled document.
pub const DOCUMENT_TITLE: &str = "AWS Log Review Evidence Pack";

/// Who reviewed what, where, and over which period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PackMetadata {
    pub checker: String,
    pub environment: String,
    /// AWS account id or alias.
    pub account: String,
    pub period_start: Option<Date>,
    pub period_end: Option<Date>,
    pub log_sources: Vec<LogSource>,
    /// Hosts, services, or accounts in scope, one per line of the report.
    pub systems_scanned: Vec<String>,
    /// Where screenshots or raw log extracts can be found.
    pub evidence: Option<String>,
    pub summary: ExecutiveSummary,
    /// Detailed analysis and log snippets, reproduced verbatim.
    pub analysis: Option<String>,
}

/// The opening verdict of a pack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExecutiveSummary {
    pub analyst: String,
    pub reason: Option<String>,
    pub overall_finding: Option<OverallFinding>,
    pub criticality: Option<Criticality>,
    pub key_takeaway: Option<String>,
}

impl ExecutiveSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A log source that was reviewed, e.g. CloudTrail and the trail names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    pub name: String,
    pub detail: String,
}

/// One line in a section.
///
/// Findings usually carry `observed_at`, `severity` and `source`;
/// recommendations carry `priority` and `owner`. Every detail is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Entry {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// System or log the finding came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Entry {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            due: None,
            observed_at: None,
            severity: None,
            source: None,
            priority: None,
            owner: None,
        }
    }

    /// A finding seen at `at` in `source`.
    pub fn finding(
        description: impl Into<String>,
        at: Timestamp,
        severity: Severity,
        source: impl Into<String>,
    ) -> Self {
        Self {
            observed_at: Some(at),
            severity: Some(severity),
            source: Some(source.into()),
            ..Self::new(description)
        }
    }

    /// A recommendation for `owner` to act on.
    pub fn recommendation(
        description: impl Into<String>,
        priority: Priority,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            priority: Some(priority),
            owner: Some(owner.into()),
            ..Self::new(description)
        }
    }

    #[must_use]
    pub fn due(mut self, date: Date) -> Self {
        self.due = Some(date);
        self
    }

    /// Whether the entry has anything beyond a description and due date.
    pub fn is_detailed(&self) -> bool {
        self.observed_at.is_some()
            || self.severity.is_some()
            || self.source.is_some()
            || self.priority.is_some()
            || self.owner.is_some()
    }
}

/// A titled list of entries. Entries are addressed by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Section {
    pub title: String,
    /// Shown in place of the list when the section has no entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_text: Option<String>,
    #[serde(default)]
    entries: Vec<Entry>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            empty_text: None,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_empty_text(mut self, text: impl Into<String>) -> Self {
        self.empty_text = Some(text.into());
        self
    }

    /// Appends an entry and returns its position.
    pub fn add_entry(&mut self, entry: Entry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Removes the entry at `index`; later entries move up one position.
    pub fn remove_entry(&mut self, index: usize) -> Option<Entry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

/// Closing attestation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Signoff {
    pub checked_by: String,
    pub reviewed_by: String,
    pub completed_on: Option<Date>,
}

/// An evidence pack being prepared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackDraft {
    #[serde(default)]
    pub metadata: PackMetadata,
    #[serde(default = "standard_sections")]
    sections: Vec<Section>,
    #[serde(default)]
    pub signoff: Signoff,
}

impl PackDraft {
    /// A draft with empty metadata and no sections.
    pub fn new(metadata: PackMetadata) -> Self {
        Self {
            metadata,
            sections: Vec::new(),
            signoff: Signoff::default(),
        }
    }

    /// A draft with the usual Findings / Actions Taken / Follow-up Required sections.
    pub fn standard(metadata: PackMetadata) -> Self {
        Self {
            sections: standard_sections(),
            ..Self::new(metadata)
        }
    }

    /// Parses a draft from TOML. Sections default to the standard set.
    pub fn from_toml(source: &str) -> Result<Self, InputError> {
        toml::from_str(source).map_err(|e| InputError::Draft(e.to_string()))
    }

    /// Appends a section and returns its position.
    pub fn add_section(&mut self, section: Section) -> usize {
        self.sections.push(section);
        self.sections.len() - 1
    }

    pub fn remove_section(&mut self, index: usize) -> Option<Section> {
        (index < self.sections.len()).then(|| self.sections.remove(index))
    }

    /// First section with the given title.
    pub fn section_mut(&mut self, title: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.title == title)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

fn standard_sections() -> Vec<Section> {
    vec![
        Section::new("Findings").with_empty_text("No findings reported"),
        Section::new("Actions Taken").with_empty_text("No actions taken"),
        Section::new("Follow-up Required").with_empty_text("No follow-up required"),
    ]
}

/// Which check records a pack covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RecordSelection {
    #[default]
    All,
    Ids {
        ids: Vec<RecordId>,
    },
    Range {
        range: DateRange,
    },
}

impl RecordSelection {
    /// Selects records by id. Duplicates are dropped, first occurrence wins.
    pub fn ids(ids: impl IntoIterator<Item = RecordId>) -> Result<Self, InputError> {
        let mut unique: Vec<RecordId> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            return Err(InputError::EmptySelection);
        }
        Ok(Self::Ids { ids: unique })
    }

    /// Selects records checked within `[start, end]`; either side may be open.
    pub fn range(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Self, InputError> {
        Ok(Self::Range {
            range: DateRange::bounded(start, end)?,
        })
    }

    pub fn includes(&self, record: &CheckRecord) -> bool {
        match self {
            Self::All => true,
            Self::Ids { ids } => ids.contains(&record.id),
            Self::Range { range } => range.contains(record.timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;

    #[test]
    fn removing_an_entry_shifts_later_positions() {
        let mut section = Section::new("Findings");
        section.add_entry(Entry::new("first"));
        section.add_entry(Entry::new("second"));
        section.add_entry(Entry::new("third"));

        let removed = section.remove_entry(1).unwrap();

        assert_eq!(removed.description, "second");
        let left: Vec<&str> = section
            .entries()
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(left, vec!["first", "third"]);
        assert!(section.remove_entry(5).is_none());
    }

    #[test]
    fn sections_are_added_and_removed_independently() {
        let mut draft = PackDraft::standard(PackMetadata::default());
        let extra = draft.add_section(Section::new("Notes"));

        draft.remove_section(0).unwrap();

        let titles: Vec<&str> = draft.sections().iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Actions Taken", "Follow-up Required", "Notes"]);
        assert_eq!(extra, 3);
    }

    #[test]
    fn draft_toml_defaults_to_standard_sections() {
        let draft = PackDraft::from_toml(
            r#"
            [metadata]
            checker = "sam"
            environment = "Production"
            account = "123456789012"
            period-start = "2024-05-01"

            [[metadata.log-sources]]
            name = "CloudTrail"
            detail = "org-trail"

            [signoff]
            checked-by = "sam"
            "#,
        )
        .unwrap();

        assert_eq!(draft.metadata.checker, "sam");
        assert_eq!(draft.metadata.period_start, Some(date(2024, 5, 1)));
        assert_eq!(draft.metadata.log_sources[0].name, "CloudTrail");
        assert_eq!(draft.sections().len(), 3);
        assert_eq!(draft.signoff.checked_by, "sam");
    }

    #[test]
    fn draft_toml_keeps_given_sections_and_entries() {
        let draft = PackDraft::from_toml(
            r#"
            [[sections]]
            title = "Follow-up Required"

            [[sections.entries]]
            description = "Rotate leaked key"
            due = "2024-05-03"
            "#,
        )
        .unwrap();

        assert_eq!(draft.sections().len(), 1);
        let entry = &draft.sections()[0].entries()[0];
        assert_eq!(entry.due, Some(date(2024, 5, 3)));
    }

    #[test]
    fn sample_draft_parses() {
        let draft = PackDraft::from_toml(include_str!("../demos/pack.toml")).unwrap();

        assert_eq!(draft.metadata.log_sources.len(), 2);
        assert_eq!(draft.metadata.period_end, Some(date(2024, 5, 7)));
        assert_eq!(draft.sections()[2].entries()[0].due, Some(date(2024, 5, 14)));
        assert_eq!(draft.signoff.reviewed_by, "lee");

        let summary = &draft.metadata.summary;
        assert_eq!(summary.overall_finding, Some(OverallFinding::MinorAnomalies));
        assert_eq!(summary.criticality, Some(Criticality::Low));
        assert_eq!(draft.metadata.systems_scanned.len(), 3);
        assert!(draft.metadata.analysis.as_deref().unwrap().contains("212 x AccessDenied"));

        let finding = &draft.sections()[0].entries()[0];
        assert_eq!(finding.severity, Some(Severity::Medium));
        assert_eq!(finding.source.as_deref(), Some("CloudTrail"));
        assert!(finding.observed_at.is_some());

        let recommendation = &draft.sections()[3].entries()[0];
        assert_eq!(recommendation.priority, Some(Priority::High));
        assert_eq!(recommendation.owner.as_deref(), Some("platform"));
    }

    #[test]
    fn entry_details_are_optional() {
        let plain = Entry::new("Rotate leaked key").due(date(2024, 5, 3));
        let finding = Entry::finding(
            "Root login",
            Timestamp::new(1_714_600_000, 0).unwrap(),
            Severity::High,
            "CloudTrail",
        );

        assert!(!plain.is_detailed());
        assert!(finding.is_detailed());
        assert!(ExecutiveSummary::default().is_empty());
    }

    #[test]
    fn unknown_severity_is_input_error() {
        let err = PackDraft::from_toml(
            r#"
            [[sections]]
            title = "Findings"
            entries = [{ description = "x", severity = "urgent" }]
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, InputError::Draft(_)));
    }

    #[test]
    fn malformed_draft_is_input_error() {
        let err = PackDraft::from_toml("metadata = 4").unwrap_err();
        assert!(matches!(err, InputError::Draft(_)));
    }

    #[test]
    fn empty_id_selection_is_rejected() {
        assert!(matches!(
            RecordSelection::ids(Vec::new()),
            Err(InputError::EmptySelection)
        ));
        assert_eq!(
            RecordSelection::ids([3, 1, 3]).unwrap(),
            RecordSelection::Ids { ids: vec![3, 1] }
        );
    }

    #[test]
    fn inverted_range_selection_is_rejected() {
        let late = Timestamp::new(2_000, 0).unwrap();
        let early = Timestamp::new(1_000, 0).unwrap();

        assert!(matches!(
            RecordSelection::range(Some(late), Some(early)),
            Err(InputError::InvertedRange { .. })
        ));
    }
}
