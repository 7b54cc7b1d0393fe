/// Page outcome definitions for recorded pages
///
/// Every PageRecord ends in exactly one of these outcomes. There are no
/// in-flight states: a record is only created once its outcome is known.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final outcome of a single observed URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// Page was fetched, cleaned and its document written
    Completed,

    /// Page could not be fetched or its document could not be written
    Failed,

    /// Page was fetched but rejected (duplicate, minimal content, non-HTML, redirect)
    Skipped,
}

impl PageStatus {
    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if this represents an error outcome
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns true if the page was deliberately rejected
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Converts the outcome to its manifest string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Parses an outcome from its manifest string representation
    ///
    /// Returns None if the string doesn't match any known outcome.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Returns all possible outcomes
    pub fn all() -> [Self; 3] {
        [Self::Completed, Self::Failed, Self::Skipped]
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_roundtrip() {
        for status in PageStatus::all() {
            assert_eq!(PageStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_unknown_string() {
        assert_eq!(PageStatus::parse("processed"), None);
        assert_eq!(PageStatus::parse(""), None);
    }

    #[test]
    fn test_classification() {
        assert!(PageStatus::Completed.is_success());
        assert!(!PageStatus::Completed.is_error());
        assert!(PageStatus::Failed.is_error());
        assert!(PageStatus::Skipped.is_skipped());
        assert!(!PageStatus::Skipped.is_success());
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&PageStatus::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
        let parsed: PageStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, PageStatus::Failed);
    }

    #[test]
    fn test_display() {
        assert_eq!(PageStatus::Completed.to_string(), "completed");
    }
}
