//! Sequential pipeline executor.
//!
//! Each stage runs in its own task so the driver can race it against the
//! run context. Stages never overlap: the next stage starts only after the
//! previous one has produced its output.

use crate::cancellation::RunContext;
use crate::core::StageValue;
use crate::errors::{PipelineError, StageError};
use crate::events::{NoOpProgressReporter, ProgressReporter};
use crate::observability::SpanTimer;
use crate::stages::Stage;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// How long an interrupted stage may keep running before it is aborted.
pub const DEFAULT_ABANDON_GRACE: Duration = Duration::from_secs(1);

/// Transforms or recovers from a stage failure.
///
/// Returning `Ok` suppresses the failure: the value becomes the result of
/// the run and no further stages execute.
pub type ErrorHandler<V> = Arc<dyn Fn(PipelineError) -> Result<V, PipelineError> + Send + Sync>;

struct PipelineState<V> {
    stages: Vec<Arc<dyn Stage<V>>>,
    error_handler: Option<ErrorHandler<V>>,
    reporter: Arc<dyn ProgressReporter>,
}

/// An ordered list of stages executed one after another.
///
/// Stages are appended before the run. [`execute`](Self::execute) takes a
/// snapshot of the stages, error handler and reporter, so changes made while
/// a run is in flight only affect later runs.
pub struct Pipeline<V = StageValue>
where
    V: Send + 'static,
{
    name: String,
    state: Mutex<PipelineState<V>>,
    abandon_grace: Duration,
}

impl<V> Pipeline<V>
where
    V: Send + 'static,
{
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(PipelineState {
                stages: Vec::new(),
                error_handler: None,
                reporter: Arc::new(NoOpProgressReporter),
            }),
            abandon_grace: DEFAULT_ABANDON_GRACE,
        }
    }

    /// Sets how long an interrupted stage may keep running before it is aborted.
    #[must_use]
    pub fn with_abandon_grace(mut self, grace: Duration) -> Self {
        self.abandon_grace = grace;
        self
    }

    /// Appends a stage, builder style.
    #[must_use]
    pub fn with_stage(self, stage: Arc<dyn Stage<V>>) -> Self {
        self.add_stage(stage);
        self
    }

    /// Appends a stage.
    pub fn add_stage(&self, stage: Arc<dyn Stage<V>>) {
        self.state.lock().stages.push(stage);
    }

    /// Installs the error handler.
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(PipelineError) -> Result<V, PipelineError> + Send + Sync + 'static,
    {
        self.state.lock().error_handler = Some(Arc::new(handler));
    }

    /// Installs the progress reporter.
    pub fn set_progress_reporter(&self, reporter: Arc<dyn ProgressReporter>) {
        self.state.lock().reporter = reporter;
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the grace period for interrupted stages.
    #[must_use]
    pub fn abandon_grace(&self) -> Duration {
        self.abandon_grace
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        self.state
            .lock()
            .stages
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().stages.len()
    }

    /// Returns true if no stages were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().stages.is_empty()
    }

    /// Runs every stage in order, threading each output into the next stage.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Canceled`] if `ctx` is done before a stage starts
    /// - [`PipelineError::Interrupted`] if `ctx` is done while a stage runs,
    ///   or the stage itself reports cancellation
    /// - [`PipelineError::StageFailed`] if a stage fails, after the error
    ///   handler had its chance to transform or recover from it
    pub async fn execute(&self, ctx: &RunContext, initial: V) -> Result<V, PipelineError> {
        let (stages, handler, reporter) = {
            let state = self.state.lock();
            (
                state.stages.clone(),
                state.error_handler.clone(),
                Arc::clone(&state.reporter),
            )
        };

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "pipeline",
            pipeline = %self.name,
            run_id = %run_id,
            stages = stages.len()
        );

        self.run_stages(ctx, &stages, handler.as_ref(), &reporter, initial)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        ctx: &RunContext,
        stages: &[Arc<dyn Stage<V>>],
        handler: Option<&ErrorHandler<V>>,
        reporter: &Arc<dyn ProgressReporter>,
        initial: V,
    ) -> Result<V, PipelineError> {
        let run_timer = SpanTimer::start(&self.name);
        let stage_ctx = ctx.with_reporter(Arc::clone(reporter));
        let mut value = initial;

        for (index, stage) in stages.iter().enumerate() {
            let name = stage.name().to_string();

            if let Some(cause) = ctx.err() {
                warn!(stage = %name, index, cause = %cause, "Run canceled before stage start");
                return Err(PipelineError::Canceled {
                    next_stage: name,
                    cause,
                });
            }

            reporter.start_stage(&name);
            debug!(stage = %name, index, "Stage started");
            let timer = SpanTimer::start(&name);

            let task_stage = Arc::clone(stage);
            let task_ctx = stage_ctx.clone();
            let mut handle: JoinHandle<Result<V, StageError>> = tokio::spawn(
                async move { task_stage.execute(&task_ctx, value).await }.in_current_span(),
            );

            // Cancellation is polled first so it wins over a stage finishing
            // at the same instant.
            let joined = tokio::select! {
                biased;
                cause = ctx.cancelled() => {
                    reporter.fail_stage(&name, &cause);
                    warn!(
                        stage = %name,
                        index,
                        cause = %cause,
                        duration_ms = timer.finish(),
                        "Stage interrupted"
                    );
                    self.abandon(name.clone(), handle);
                    return Err(PipelineError::Interrupted { stage: name, cause });
                }
                joined = &mut handle => joined,
            };

            let result = joined.unwrap_or_else(|e| Err(StageError::Panicked(panic_message(e))));

            match result {
                Ok(output) => {
                    reporter.complete_stage(&name);
                    info!(stage = %name, index, duration_ms = timer.finish(), "Stage completed");
                    value = output;
                }
                Err(StageError::Canceled(cause)) => {
                    reporter.fail_stage(&name, &cause);
                    warn!(
                        stage = %name,
                        index,
                        cause = %cause,
                        duration_ms = timer.finish(),
                        "Stage stopped on cancellation"
                    );
                    return Err(PipelineError::Interrupted { stage: name, cause });
                }
                Err(source) => {
                    reporter.fail_stage(&name, &source);
                    warn!(
                        stage = %name,
                        index,
                        error = %source,
                        duration_ms = timer.finish(),
                        "Stage failed"
                    );
                    let error = PipelineError::StageFailed {
                        stage: name,
                        source,
                    };
                    return match handler {
                        Some(handler) => (**handler)(error),
                        None => Err(error),
                    };
                }
            }
        }

        info!(duration_ms = run_timer.finish(), "Pipeline completed");
        Ok(value)
    }

    /// Leaves an interrupted stage running for the grace period, then aborts it.
    fn abandon(&self, stage: String, mut handle: JoinHandle<Result<V, StageError>>) {
        let grace = self.abandon_grace;
        tokio::spawn(
            async move {
                if tokio::time::timeout(grace, &mut handle).await.is_ok() {
                    debug!(stage = %stage, "Interrupted stage finished within grace period");
                } else {
                    handle.abort();
                    warn!(
                        stage = %stage,
                        grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                        "Interrupted stage ignored cancellation; task aborted"
                    );
                }
            }
            .in_current_span(),
        );
    }
}

impl<V> std::fmt::Debug for Pipeline<V>
where
    V: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &state.stages)
            .field("has_error_handler", &state.error_handler.is_some())
            .field("abandon_grace", &self.abandon_grace)
            .finish()
    }
}

fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CancelCause;
    use crate::stages::FnStage;

    fn add_one(name: &str) -> Arc<dyn Stage<u32>> {
        Arc::new(FnStage::new(name, |_ctx: RunContext, n: u32| async move {
            Ok::<_, StageError>(n + 1)
        }))
    }

    #[tokio::test]
    async fn test_empty_pipeline_returns_initial() {
        let pipeline: Pipeline<u32> = Pipeline::new("empty");
        assert!(pipeline.is_empty());

        let out = pipeline.execute(&RunContext::new(), 7).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn test_outputs_thread_through_stages() {
        let pipeline = Pipeline::new("count")
            .with_stage(add_one("one"))
            .with_stage(add_one("two"))
            .with_stage(add_one("three"));

        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.stage_names(), vec!["one", "two", "three"]);

        let out = pipeline.execute(&RunContext::new(), 0).await.unwrap();
        assert_eq!(out, 3);
    }

    #[tokio::test]
    async fn test_handler_can_recover() {
        let pipeline: Pipeline<u32> = Pipeline::new("recover");
        pipeline.add_stage(Arc::new(FnStage::new(
            "fails",
            |_ctx: RunContext, _n: u32| async move { Err::<u32, _>(StageError::failed("boom")) },
        )));
        pipeline.add_stage(add_one("never"));
        pipeline.set_error_handler(|err| {
            assert_eq!(err.stage(), Some("fails"));
            Ok(42)
        });

        let out = pipeline.execute(&RunContext::new(), 0).await.unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn test_handler_can_transform() {
        let pipeline: Pipeline<u32> = Pipeline::new("transform");
        pipeline.add_stage(Arc::new(FnStage::new(
            "fails",
            |_ctx: RunContext, _n: u32| async move { Err::<u32, _>(StageError::failed("boom")) },
        )));
        pipeline.set_error_handler(|err| {
            Err(PipelineError::StageFailed {
                stage: "renamed".to_string(),
                source: StageError::failed(err.to_string()),
            })
        });

        let err = pipeline.execute(&RunContext::new(), 0).await.unwrap_err();
        assert_eq!(err.to_string(), "stage renamed failed: stage fails failed: boom");
    }

    #[tokio::test]
    async fn test_stage_reported_cancellation_is_interruption() {
        let pipeline: Pipeline<u32> = Pipeline::new("self-cancel");
        pipeline.add_stage(Arc::new(FnStage::new(
            "quits",
            |_ctx: RunContext, _n: u32| async move {
                Err::<u32, _>(StageError::Canceled(CancelCause::Canceled(
                    "stage gave up".to_string(),
                )))
            },
        )));
        pipeline.set_error_handler(|_| panic!("cancellation must bypass the handler"));

        let err = pipeline.execute(&RunContext::new(), 0).await.unwrap_err();
        assert!(matches!(err, PipelineError::Interrupted { ref stage, .. } if stage == "quits"));
    }

    #[tokio::test]
    async fn test_panicking_stage_is_failure() {
        let pipeline: Pipeline<u32> = Pipeline::new("panics");
        pipeline.add_stage(Arc::new(FnStage::new(
            "explodes",
            |_ctx: RunContext, n: u32| async move {
                if n == 0 {
                    panic!("kaboom");
                }
                Ok::<_, StageError>(n)
            },
        )));

        let err = pipeline.execute(&RunContext::new(), 0).await.unwrap_err();
        match err {
            PipelineError::StageFailed { stage, source } => {
                assert_eq!(stage, "explodes");
                assert!(matches!(source, StageError::Panicked(ref m) if m == "kaboom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
