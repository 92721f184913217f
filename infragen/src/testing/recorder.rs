//! A progress reporter that records events for assertions.

use crate::cancellation::RunContext;
use crate::core::{ProgressEvent, ProgressPhase};
use crate::events::ProgressReporter;
use parking_lot::Mutex;
use std::error::Error;

/// Records every reporter call as a [`ProgressEvent`].
///
/// Unlike the console reporter it keeps duplicates, so tests can see exactly
/// what the executor reported.
#[derive(Debug, Default)]
pub struct RecordingProgressReporter {
    events: Mutex<Vec<ProgressEvent>>,
    cancel_after: Mutex<Option<(String, RunContext)>>,
}

impl RecordingProgressReporter {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels `ctx` as soon as stage `stage` is reported complete.
    #[must_use]
    pub fn cancel_after(self, stage: impl Into<String>, ctx: RunContext) -> Self {
        *self.cancel_after.lock() = Some((stage.into(), ctx));
        self
    }

    /// Returns all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// Returns the stages that reported a start, in order.
    #[must_use]
    pub fn started(&self) -> Vec<String> {
        self.stages_in(ProgressPhase::Started)
    }

    /// Returns the stages that reported completion, in order.
    #[must_use]
    pub fn completed(&self) -> Vec<String> {
        self.stages_in(ProgressPhase::Completed)
    }

    /// Returns the stages that reported failure, in order.
    #[must_use]
    pub fn failed(&self) -> Vec<String> {
        self.stages_in(ProgressPhase::Failed)
    }

    /// Returns the failure message recorded for `stage`.
    #[must_use]
    pub fn failure_message(&self, stage: &str) -> Option<String> {
        self.events
            .lock()
            .iter()
            .find(|e| e.stage == stage && e.phase == Some(ProgressPhase::Failed))
            .and_then(|e| e.message.clone())
    }

    fn stages_in(&self, phase: ProgressPhase) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.phase == Some(phase))
            .map(|e| e.stage.clone())
            .collect()
    }
}

impl ProgressReporter for RecordingProgressReporter {
    fn start_stage(&self, name: &str) {
        self.events.lock().push(ProgressEvent::started(name));
    }

    fn complete_stage(&self, name: &str) {
        self.events.lock().push(ProgressEvent::completed(name, None));
        if let Some((stage, ctx)) = &*self.cancel_after.lock() {
            if stage == name {
                ctx.cancel(format!("canceled after {name}"));
            }
        }
    }

    fn fail_stage(&self, name: &str, error: &dyn Error) {
        self.events
            .lock()
            .push(ProgressEvent::failed(name, &error.to_string()));
    }

    fn update_progress(&self, message: &str, percent: Option<u8>) {
        self.events
            .lock()
            .push(ProgressEvent::update(message, percent));
    }
}
