//! Progress reporter trait and simple implementations.

use std::error::Error;
use tracing::{debug, info, warn};

/// Observer of stage lifecycle and progress.
///
/// Methods are called from the pipeline driver and must not block.
pub trait ProgressReporter: Send + Sync {
    /// A stage started.
    fn start_stage(&self, name: &str);

    /// A stage completed successfully.
    fn complete_stage(&self, name: &str);

    /// A stage failed or was interrupted.
    fn fail_stage(&self, name: &str, error: &dyn Error);

    /// A free-form progress update.
    fn update_progress(&self, message: &str, percent: Option<u8>);
}

/// A reporter that discards everything.
///
/// Used as the default when no reporter is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn start_stage(&self, _name: &str) {}
    fn complete_stage(&self, _name: &str) {}
    fn fail_stage(&self, _name: &str, _error: &dyn Error) {}
    fn update_progress(&self, _message: &str, _percent: Option<u8>) {}
}

/// A reporter that emits tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingProgressReporter;

impl ProgressReporter for LoggingProgressReporter {
    fn start_stage(&self, name: &str) {
        info!(stage = %name, phase = "started", "Stage started");
    }

    fn complete_stage(&self, name: &str) {
        info!(stage = %name, phase = "completed", "Stage completed");
    }

    fn fail_stage(&self, name: &str, error: &dyn Error) {
        warn!(stage = %name, phase = "failed", error = %error, "Stage failed");
    }

    fn update_progress(&self, message: &str, percent: Option<u8>) {
        debug!(percent = ?percent, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageError;

    #[test]
    fn test_noop_and_logging_reporters() {
        let err = StageError::failed("boom");
        for reporter in [
            &NoOpProgressReporter as &dyn ProgressReporter,
            &LoggingProgressReporter,
        ] {
            reporter.start_stage("A");
            reporter.update_progress("halfway", Some(50));
            reporter.fail_stage("A", &err);
            reporter.complete_stage("B");
        }
    }
}
