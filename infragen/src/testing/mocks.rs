//! Mock stages for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cancellation::RunContext;
use crate::errors::StageError;
use crate::stages::Stage;

/// A stage that appends its own name to a list of names.
#[derive(Debug)]
pub struct AppendNameStage {
    name: String,
    calls: AtomicUsize,
}

impl AppendNameStage {
    /// Creates a new appending stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of times the stage ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stage<Vec<String>> for AppendNameStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &RunContext, mut input: Vec<String>) -> Result<Vec<String>, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.check()?;
        input.push(self.name.clone());
        Ok(input)
    }
}

/// A stage that returns its input unchanged and counts calls.
#[derive(Debug)]
pub struct PassThroughStage {
    name: String,
    calls: AtomicUsize,
}

impl PassThroughStage {
    /// Creates a new pass-through stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of times the stage ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<V> Stage<V> for PassThroughStage
where
    V: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &RunContext, input: V) -> Result<V, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(input)
    }
}

/// A stage that always fails.
#[derive(Debug)]
pub struct FailingStage {
    name: String,
    message: String,
    calls: AtomicUsize,
}

impl FailingStage {
    /// Creates a new failing stage.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of times the stage ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<V> Stage<V> for FailingStage
where
    V: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &RunContext, _input: V) -> Result<V, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StageError::failed(self.message.clone()))
    }
}

/// A cooperative stage that sleeps in steps and checks the context after each.
#[derive(Debug)]
pub struct SlowStage {
    name: String,
    delay: Duration,
    steps: usize,
    finished: AtomicBool,
}

impl SlowStage {
    /// Creates a slow stage that sleeps `delay` once.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            steps: 1,
            finished: AtomicBool::new(false),
        }
    }

    /// Sets how many times the stage sleeps.
    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the stage ran to the end.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<V> Stage<V> for SlowStage
where
    V: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &RunContext, input: V) -> Result<V, StageError> {
        for _ in 0..self.steps {
            tokio::time::sleep(self.delay).await;
            ctx.check()?;
        }
        self.finished.store(true, Ordering::SeqCst);
        Ok(input)
    }
}

/// Sets a flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A stage that ignores cancellation entirely.
#[derive(Debug)]
pub struct StubbornStage {
    name: String,
    delay: Duration,
    finished: AtomicBool,
    released: Arc<AtomicBool>,
}

impl StubbornStage {
    /// Creates a stage that sleeps `delay` without checking its context.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            finished: AtomicBool::new(false),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the stage ran to the end.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Returns true once the stage's future was dropped, finished or aborted.
    #[must_use]
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<V> Stage<V> for StubbornStage
where
    V: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &RunContext, input: V) -> Result<V, StageError> {
        let _flag = DropFlag(Arc::clone(&self.released));
        tokio::time::sleep(self.delay).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(input)
    }
}

/// A stage that panics.
#[derive(Debug)]
pub struct PanickingStage {
    name: String,
    message: String,
}

impl PanickingStage {
    /// Creates a stage that panics with `message`.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl<V> Stage<V> for PanickingStage
where
    V: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &RunContext, _input: V) -> Result<V, StageError> {
        panic!("{}", self.message);
    }
}
