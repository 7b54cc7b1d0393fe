/// Session lifecycle definitions
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a crawl session
///
/// A session starts `Running`, and ends either `Completed` (the frontier was
/// exhausted or the page limit reached) or `Interrupted` (stopped early by a
/// signal). An interrupted or crashed-while-running session can be resumed;
/// a completed one is frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Interrupted,
}

impl SessionStatus {
    /// Returns true if the session can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if a later run may continue this session
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Running | Self::Interrupted)
    }

    /// Converts the status to its manifest string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    /// Parses a status from its manifest string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
