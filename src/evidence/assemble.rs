//! Evidence document assembly.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{CheckRecord, InputError, RecordId};

use super::{DOCUMENT_TITLE, PackDraft, PackMetadata, RecordSelection, Section, Signoff};

/// How many included records carry one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCount {
    pub outcome: String,
    pub count: usize,
}

/// An assembled evidence pack, ready for a presenter to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceDocument {
    pub title: String,
    pub metadata: PackMetadata,
    pub selection: RecordSelection,
    pub sections: Vec<Section>,
    /// Included records, oldest first.
    pub records: Vec<CheckRecord>,
    /// Selected ids with no matching record.
    pub missing_ids: Vec<RecordId>,
    /// Outcome counts in order of first appearance in `records`.
    pub tally: Vec<OutcomeCount>,
    pub signoff: Signoff,
    /// Hex SHA-256 of the document with this field empty.
    pub fingerprint: String,
}

impl EvidenceDocument {
    /// Reads back a document exported as JSON. The fingerprint is not checked.
    pub fn from_json(source: &str) -> Result<Self, InputError> {
        serde_json::from_str(source).map_err(|e| InputError::Document(e.to_string()))
    }

    /// Whether `fingerprint` still matches the content.
    pub fn fingerprint_matches(&self) -> bool {
        let mut unsealed = self.clone();
        unsealed.fingerprint.clear();
        unsealed.digest() == self.fingerprint
    }

    fn digest(&self) -> String {
        // Serializing plain data to a Vec cannot fail.
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }
}

/// Builds the document for `draft` from the `records` that `selection` admits.
///
/// Sections keep draft order; records are sorted by timestamp, then id.
/// Pure: identical inputs give identical documents, fingerprint included.
pub fn assemble(
    draft: &PackDraft,
    records: &[CheckRecord],
    selection: &RecordSelection,
) -> EvidenceDocument {
    let mut included: Vec<CheckRecord> = records
        .iter()
        .filter(|r| selection.includes(r))
        .cloned()
        .collect();
    included.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    included.dedup_by_key(|r| r.id);

    let missing_ids = match selection {
        RecordSelection::Ids { ids } => ids
            .iter()
            .copied()
            .filter(|id| !included.iter().any(|r| r.id == *id))
            .collect(),
        RecordSelection::All | RecordSelection::Range { .. } => Vec::new(),
    };

    let mut tally: Vec<OutcomeCount> = Vec::new();
    for record in &included {
        match tally.iter_mut().find(|t| t.outcome == record.outcome) {
            Some(t) => t.count += 1,
            None => tally.push(OutcomeCount {
                outcome: record.outcome.clone(),
                count: 1,
            }),
        }
    }

    let mut document = EvidenceDocument {
        title: DOCUMENT_TITLE.to_string(),
        metadata: draft.metadata.clone(),
        selection: selection.clone(),
        sections: draft.sections().to_vec(),
        records: included,
        missing_ids,
        tally,
        signoff: draft.signoff.clone(),
        fingerprint: String::new(),
    };
    document.fingerprint = document.digest();
    document
}
