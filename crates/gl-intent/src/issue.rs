use serde::{Deserialize, Serialize};

/// Severity of a validation issue or warning.
///
/// Variant order matters — `#[derive(Ord)]` uses it, so Warning < Error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a validation issue is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnrecognizedOperation,
    LowConfidence,
    MissingInputLayer,
    MissingParameter,
    MissingSecondaryLayer,
    MissingSelectionCriteria,
    InvalidParameter,
    PerformanceRisk,
    /// Raised by a registered risk rule; carries the rule id.
    Risk(String),
}

/// A structural problem found while validating an interpreted command.
/// Severity `Error` blocks execution; `Warning` is surfaced but does not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// An advisory attached by the optimizer or interpretation stages.
/// Warnings never block execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Short category tag ("performance", "geometry", "memory", ...).
    pub kind: String,
    pub message: String,
    pub severity: Severity,
}

impl Warning {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn severity_serialization() {
        assert_eq!(
            serde_json::to_string(&Severity::Error).unwrap(),
            r#""error""#
        );
    }

    #[test]
    fn issue_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&IssueKind::MissingSecondaryLayer).unwrap(),
            r#""missing_secondary_layer""#
        );
        let risk = IssueKind::Risk("buffer_distance_too_large".into());
        let json = serde_json::to_string(&risk).unwrap();
        assert!(json.contains("buffer_distance_too_large"));
    }

    #[test]
    fn issue_constructors() {
        let issue = ValidationIssue::error(IssueKind::MissingInputLayer, "no input layer");
        assert_eq!(issue.severity, Severity::Error);
        let warn = ValidationIssue::warning(IssueKind::LowConfidence, "low confidence");
        assert_eq!(warn.severity, Severity::Warning);
    }
}
