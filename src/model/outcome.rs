//! The closed set of recognized check outcomes.

use serde::{Deserialize, Serialize};

/// Outcomes shipped when the config file names none.
pub const DEFAULT_OUTCOMES: [&str; 5] = [
    "All Good",
    "Issues Found",
    "Needs Investigation",
    "Action Required",
    "No Access",
];

/// Ordered set of outcome labels a check may be recorded with.
///
/// Order is preserved for display; matching is exact after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeSet(Vec<String>);

impl OutcomeSet {
    pub fn new(outcomes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(outcomes.into_iter().map(Into::into).collect())
    }

    /// Returns the canonical label for `candidate`, if it is recognized.
    pub fn resolve(&self, candidate: &str) -> Option<&str> {
        let candidate = candidate.trim();
        self.0
            .iter()
            .find(|o| o.as_str() == candidate)
            .map(String::as_str)
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.resolve(candidate).is_some()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first label that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<&str> {
        self.0
            .iter()
            .enumerate()
            .find(|(i, o)| self.0[..*i].contains(o))
            .map(|(_, o)| o.as_str())
    }
}

impl Default for OutcomeSet {
    fn default() -> Self {
        Self::new(DEFAULT_OUTCOMES)
    }
}
