//! Stage trait and the built-in stages.
//!
//! Stages are the fundamental units of work in a pipeline. The engine is
//! generic over the value passed between stages; the built-in stages use
//! [`StageValue`].

mod builder;
mod crossplane;
mod extract;
mod terraform;
mod writer;

pub use builder::{ModelBuildingStage, BUILD_MODEL};
pub use crossplane::{CrossplaneGenerationStage, GENERATE_CROSSPLANE};
pub use extract::{EntityExtractionStage, EXTRACT_ENTITIES};
pub use terraform::{TerraformGenerationStage, GENERATE_TERRAFORM};
pub use writer::{OutputWriterStage, WRITE_OUTPUT};

use crate::cancellation::RunContext;
use crate::core::StageValue;
use crate::errors::StageError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;

/// Trait for pipeline stages.
///
/// A stage consumes the previous stage's output (or the run's initial value)
/// and produces the next stage's input. Stages that do long-running work
/// should checkpoint `ctx` with [`RunContext::check`] or race their work
/// against [`RunContext::cancelled`].
#[async_trait]
pub trait Stage<V = StageValue>: Send + Sync + Debug
where
    V: Send + 'static,
{
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Executes the stage.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The governing run context
    /// * `input` - The previous stage's output
    async fn execute(&self, ctx: &RunContext, input: V) -> Result<V, StageError>;
}

/// A stage backed by an async closure.
pub struct FnStage<F> {
    name: String,
    func: F,
}

impl<F> FnStage<F> {
    /// Creates a new function-based stage.
    pub fn new<V, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(RunContext, V) -> Fut + Send + Sync,
        Fut: Future<Output = Result<V, StageError>> + Send,
    {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<V, F, Fut> Stage<V> for FnStage<F>
where
    V: Send + 'static,
    F: Fn(RunContext, V) -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, StageError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &RunContext, input: V) -> Result<V, StageError> {
        (self.func)(ctx.clone(), input).await
    }
}
