//! Progress events emitted while a pipeline runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    /// The stage started.
    Started,
    /// The stage completed successfully.
    Completed,
    /// The stage failed or was interrupted.
    Failed,
}

impl ProgressPhase {
    /// Returns true for completed and failed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A single progress observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The stage the event belongs to. Empty for free-form updates.
    pub stage: String,
    /// The lifecycle phase.
    pub phase: Option<ProgressPhase>,
    /// Optional free text (error message for failures).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Optional percentage complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    /// When the event was observed (RFC 3339).
    pub timestamp: String,
}

impl ProgressEvent {
    fn new(stage: impl Into<String>, phase: Option<ProgressPhase>) -> Self {
        Self {
            stage: stage.into(),
            phase,
            message: None,
            percent: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Creates a started event.
    #[must_use]
    pub fn started(stage: &str) -> Self {
        Self::new(stage, Some(ProgressPhase::Started))
    }

    /// Creates a completed event.
    #[must_use]
    pub fn completed(stage: &str, percent: Option<u8>) -> Self {
        let mut event = Self::new(stage, Some(ProgressPhase::Completed));
        event.percent = percent;
        event
    }

    /// Creates a failed event carrying the error text.
    #[must_use]
    pub fn failed(stage: &str, error: &str) -> Self {
        let mut event = Self::new(stage, Some(ProgressPhase::Failed));
        event.message = Some(error.to_string());
        event
    }

    /// Creates a free-form progress update.
    #[must_use]
    pub fn update(message: &str, percent: Option<u8>) -> Self {
        let mut event = Self::new("", None);
        event.message = Some(message.to_string());
        event.percent = percent;
        event
    }

    /// Returns true if this is a completed or failed event.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.phase.is_some_and(ProgressPhase::is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_event() {
        let event = ProgressEvent::started("extract-entities");
        assert_eq!(event.stage, "extract-entities");
        assert_eq!(event.phase, Some(ProgressPhase::Started));
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_failed_event_is_terminal() {
        let event = ProgressEvent::failed("build-model", "no resources");
        assert!(event.is_terminal());
        assert_eq!(event.message.as_deref(), Some("no resources"));
    }

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::completed("A", Some(33));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["stage"], "A");
        assert_eq!(json["phase"], "completed");
        assert_eq!(json["percent"], 33);
        assert!(json.get("message").is_none());
    }
}
