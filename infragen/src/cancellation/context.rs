//! Run context carrying cancellation, an optional deadline and a progress handle.

use super::CancellationToken;
use crate::errors::CancelCause;
use crate::events::ProgressReporter;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// The governing context for a pipeline run.
///
/// Cloning shares the same token and deadline. Use [`child`](Self::child) or
/// [`with_timeout`](Self::with_timeout) to derive a context that can be
/// cancelled independently of its parent.
#[derive(Clone, Default)]
pub struct RunContext {
    token: Arc<CancellationToken>,
    deadline: Option<Instant>,
    reporter: Option<Arc<dyn ProgressReporter>>,
}

impl RunContext {
    /// Creates a context with no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a child context cancelled whenever this one is.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: CancellationToken::child_of(&self.token),
            deadline: self.deadline,
            reporter: self.reporter.clone(),
        }
    }

    /// Derives a child context that also expires after `timeout`.
    ///
    /// The earlier of the parent's deadline and the new one applies. A
    /// timeout too large to represent as an instant adds no deadline.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(),
        }
    }

    /// Derives a child context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.child();
        child.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        child
    }

    /// Returns a handle on the same run that forwards updates to `reporter`.
    ///
    /// Shares this context's token and deadline.
    #[must_use]
    pub fn with_reporter(&self, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            token: Arc::clone(&self.token),
            deadline: self.deadline,
            reporter: Some(reporter),
        }
    }

    /// Sends a free-form progress update to the run's reporter, if any.
    pub fn report_progress(&self, message: &str, percent: Option<u8>) {
        if let Some(reporter) = &self.reporter {
            reporter.update_progress(message, percent);
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.token.cancel(reason);
    }

    /// Returns the underlying token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is done, or `None` while it is live.
    ///
    /// Explicit cancellation is reported ahead of an expired deadline.
    #[must_use]
    pub fn err(&self) -> Option<CancelCause> {
        if self.token.is_cancelled() {
            return Some(CancelCause::Canceled(self.token.reason().unwrap_or_default()));
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    /// Returns true once the context is cancelled or expired.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Checkpoint for stages: fails if the context is done.
    pub fn check(&self) -> Result<(), CancelCause> {
        self.err().map_or(Ok(()), Err)
    }

    /// Waits until the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) -> CancelCause {
        if let Some(cause) = self.err() {
            return cause;
        }

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }

        self.err().unwrap_or(CancelCause::DeadlineExceeded)
    }

    /// Sleeps for `duration` unless the context finishes first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), CancelCause> {
        tokio::select! {
            biased;
            cause = self.cancelled() => Err(cause),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("token", &self.token)
            .field("deadline", &self.deadline)
            .field("has_reporter", &self.reporter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingProgressReporter;

    #[test]
    fn test_new_context_is_live() {
        let ctx = RunContext::new();
        assert!(ctx.err().is_none());
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_reports_reason() {
        let ctx = RunContext::new();
        ctx.cancel("user abort");
        assert_eq!(ctx.err(), Some(CancelCause::Canceled("user abort".to_string())));
    }

    #[test]
    fn test_child_cancel_is_isolated() {
        let parent = RunContext::new();
        let child = parent.child();

        child.cancel("child");
        assert!(child.is_done());
        assert!(!parent.is_done());

        let second = parent.child();
        parent.cancel("parent");
        assert!(second.is_done());
    }

    #[test]
    fn test_with_timeout_keeps_earlier_deadline() {
        let parent = RunContext::new().with_timeout(Duration::from_millis(50));
        let child = parent.with_timeout(Duration::from_secs(60));

        assert_eq!(child.deadline(), parent.deadline());
    }

    #[test]
    fn test_unrepresentable_timeout_adds_no_deadline() {
        let ctx = RunContext::new().with_timeout(Duration::from_secs_f64(1e19));
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_done());

        let bounded = RunContext::new().with_timeout(Duration::from_secs(60));
        let child = bounded.with_timeout(Duration::MAX);
        assert_eq!(child.deadline(), bounded.deadline());
    }

    #[test]
    fn test_child_contexts_release_parent_token() {
        let parent = RunContext::new();
        for _ in 0..100 {
            let _ = parent.with_timeout(Duration::from_secs(1));
        }
        assert_eq!(parent.token().callback_count(), 0);
    }

    #[test]
    fn test_report_progress_reaches_reporter() {
        let recorder = Arc::new(RecordingProgressReporter::new());
        let ctx = RunContext::new().with_reporter(recorder.clone());

        ctx.child().report_progress("rendering", Some(40));
        RunContext::new().report_progress("dropped", None);

        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message.as_deref(), Some("rendering"));
        assert_eq!(events[0].percent, Some(40));
    }

    #[test]
    fn test_with_reporter_shares_cancellation() {
        let ctx = RunContext::new();
        let reporting = ctx.with_reporter(Arc::new(RecordingProgressReporter::new()));

        ctx.cancel("stop");
        assert!(reporting.is_done());
    }

    #[tokio::test]
    async fn test_deadline_expires() {
        let ctx = RunContext::new().with_timeout(Duration::from_millis(20));
        let cause = ctx.cancelled().await;

        assert_eq!(cause, CancelCause::DeadlineExceeded);
        assert_eq!(ctx.check(), Err(CancelCause::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_sleep_interrupted_by_cancel() {
        let ctx = RunContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel("stop");
        });

        let started = std::time::Instant::now();
        let result = ctx.sleep(Duration::from_secs(5)).await;

        assert_eq!(result, Err(CancelCause::Canceled("stop".to_string())));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sleep_completes_when_live() {
        let ctx = RunContext::new();
        assert_eq!(ctx.sleep(Duration::from_millis(5)).await, Ok(()));
    }
}
