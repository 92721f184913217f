//! Error types for the infragen pipeline engine.
//!
//! Errors are layered: stages return [`StageError`], the executor attributes
//! them to a stage and wraps them in [`PipelineError`], and the coordinator
//! rejects bad run configurations with [`ConfigurationError`] before any
//! stage runs.

use crate::core::ValueKind;
use std::path::PathBuf;
use thiserror::Error;

/// Why a [`RunContext`](crate::cancellation::RunContext) stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelCause {
    /// Cancellation was requested explicitly.
    #[error("context canceled: {0}")]
    Canceled(String),

    /// The context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// An error produced by a single stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage received a value of the wrong kind.
    #[error("invalid input: expected {expected}, got {actual}")]
    InvalidInput {
        /// The kind the stage accepts.
        expected: ValueKind,
        /// The kind it was given.
        actual: ValueKind,
    },

    /// The stage's own logic failed.
    #[error("{0}")]
    Failed(String),

    /// The stage observed cancellation and stopped early.
    #[error("{0}")]
    Canceled(CancelCause),

    /// An I/O error inside the stage.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Manifest serialization failed.
    #[error("yaml serialization failed: {0}")]
    Yaml(#[from] serde_yml::Error),

    /// The stage task panicked.
    #[error("stage task panicked: {0}")]
    Panicked(String),

    /// Any other collaborator error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    /// Creates a plain failure with a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(expected: ValueKind, actual: ValueKind) -> Self {
        Self::InvalidInput { expected, actual }
    }
}

impl From<CancelCause> for StageError {
    fn from(cause: CancelCause) -> Self {
        Self::Canceled(cause)
    }
}

/// Validation failures raised by the coordinator before a run starts.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Neither an inline description nor an input file was given.
    #[error("either a description or an input file is required")]
    MissingInput,

    /// The requested output format is not registered.
    #[error("unsupported output format '{format}' (supported: {})", supported.join(", "))]
    UnsupportedFormat {
        /// The requested format name.
        format: String,
        /// The registered format names.
        supported: Vec<String>,
    },

    /// The input file could not be read.
    #[error("cannot read input file {}: {source}", path.display())]
    UnreadableInput {
        /// The input path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The output directory could not be created.
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDirectory {
        /// The output directory.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Two adjacent stages disagree on the value passed between them.
    #[error("stage {downstream} expects {expected} but {upstream} produces {produced}")]
    StageMismatch {
        /// The producing stage (or `input` for the run's initial value).
        upstream: String,
        /// The consuming stage.
        downstream: String,
        /// What the upstream produces.
        produced: ValueKind,
        /// What the downstream accepts.
        expected: ValueKind,
    },

    /// No stages were wired.
    #[error("pipeline has no stages")]
    EmptyPipeline,
}

/// The error returned from a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage returned an error.
    #[error("stage {stage} failed: {source}")]
    StageFailed {
        /// The failing stage.
        stage: String,
        /// What the stage reported.
        #[source]
        source: StageError,
    },

    /// The context was done before the next stage could start.
    #[error("pipeline execution canceled: {cause}")]
    Canceled {
        /// The stage that would have run next.
        next_stage: String,
        /// The context error.
        cause: CancelCause,
    },

    /// The context was done while a stage was running.
    #[error("pipeline stage {stage} interrupted: {cause}")]
    Interrupted {
        /// The stage that was running.
        stage: String,
        /// The context error.
        cause: CancelCause,
    },

    /// The run configuration was rejected.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl PipelineError {
    /// Returns true for both cancellation shapes.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled { .. } | Self::Interrupted { .. })
    }

    /// Returns the stage this error is attributed to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::StageFailed { stage, .. } | Self::Interrupted { stage, .. } => Some(stage),
            Self::Canceled { next_stage, .. } => Some(next_stage),
            Self::Configuration(_) => None,
        }
    }

    /// Returns the context error for cancellation shapes.
    #[must_use]
    pub fn cancel_cause(&self) -> Option<&CancelCause> {
        match self {
            Self::Canceled { cause, .. } | Self::Interrupted { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failed_format() {
        let err = PipelineError::StageFailed {
            stage: "B".to_string(),
            source: StageError::failed("boom"),
        };
        assert_eq!(err.to_string(), "stage B failed: boom");
        assert_eq!(err.stage(), Some("B"));
        assert!(!err.is_cancellation());
    }

    #[test]
    fn test_canceled_format() {
        let err = PipelineError::Canceled {
            next_stage: "C".to_string(),
            cause: CancelCause::Canceled("user abort".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "pipeline execution canceled: context canceled: user abort"
        );
        assert_eq!(err.stage(), Some("C"));
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_interrupted_format() {
        let err = PipelineError::Interrupted {
            stage: "slow".to_string(),
            cause: CancelCause::DeadlineExceeded,
        };
        assert_eq!(
            err.to_string(),
            "pipeline stage slow interrupted: context deadline exceeded"
        );
        assert_eq!(err.cancel_cause(), Some(&CancelCause::DeadlineExceeded));
    }

    #[test]
    fn test_invalid_input_format() {
        let err = StageError::invalid_input(ValueKind::Model, ValueKind::Text);
        assert_eq!(err.to_string(), "invalid input: expected model, got text");
    }

    #[test]
    fn test_unsupported_format_lists_supported() {
        let err = ConfigurationError::UnsupportedFormat {
            format: "pulumi".to_string(),
            supported: vec!["terraform".to_string(), "crossplane".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unsupported output format 'pulumi' (supported: terraform, crossplane)"
        );
    }

    #[test]
    fn test_configuration_error_is_transparent() {
        let err: PipelineError = ConfigurationError::MissingInput.into();
        assert_eq!(
            err.to_string(),
            "either a description or an input file is required"
        );
        assert!(err.stage().is_none());
    }
}
