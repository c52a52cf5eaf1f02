//! Fixed rating scales used in evidence packs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The reviewer's one-line verdict on the whole period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverallFinding {
    NoAnomalies,
    MinorAnomalies,
    SignificantIncident,
}

impl fmt::Display for OverallFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoAnomalies => "No Anomalies Detected",
            Self::MinorAnomalies => "Minor Anomalies Detected",
            Self::SignificantIncident => "Significant Incident Identified",
        })
    }
}

/// Business impact of what the review turned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criticality {
    Critical,
    High,
    Medium,
    Low,
    #[serde(rename = "none")]
    NoImpact,
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::NoImpact => "None",
        })
    }
}

/// How serious a single finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    High,
    Medium,
    Low,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Info => "Info",
        })
    }
}

/// How soon a recommendation should be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Ratings {
        finding: OverallFinding,
        criticality: Criticality,
        severity: Severity,
        priority: Priority,
    }

    #[test]
    fn ratings_read_kebab_case_and_print_labels() {
        let ratings: Ratings = toml::from_str(
            r#"
            finding = "minor-anomalies"
            criticality = "none"
            severity = "info"
            priority = "high"
            "#,
        )
        .unwrap();

        assert_eq!(ratings.finding.to_string(), "Minor Anomalies Detected");
        assert_eq!(ratings.criticality, Criticality::NoImpact);
        assert_eq!(ratings.criticality.to_string(), "None");
        assert_eq!(ratings.severity, Severity::Info);
        assert_eq!(ratings.priority.to_string(), "High");
    }

    #[test]
    fn unknown_rating_is_rejected() {
        let parsed: Result<Ratings, _> = toml::from_str(
            r#"
            finding = "all-fine"
            criticality = "low"
            severity = "low"
            priority = "low"
            "#,
        );

        assert!(parsed.is_err());
    }
}
