//! # Infragen
//!
//! Turns free-text infrastructure descriptions into Terraform or Crossplane
//! manifests.
//!
//! The core is a small pipeline engine:
//!
//! - **Stage-based execution**: named stages run one after another, each
//!   consuming the previous stage's output
//! - **Cancellation handling**: every stage is raced against a run context
//!   carrying a cancellation token and an optional deadline
//! - **Progress reporting**: stage transitions go to a reporter that never
//!   blocks the run
//! - **Coordination**: a run configuration is validated, wired from a stage
//!   catalog and executed, and the final value is summarized for the caller
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use infragen::prelude::*;
//!
//! let config = RunConfig::new()
//!     .with_description("3 web servers behind a load balancer and a postgres database")
//!     .with_format("terraform")
//!     .with_output_dir("out")
//!     .with_progress(Arc::new(StdoutSink));
//!
//! let summary = Coordinator::new().run(&RunContext::new(), &config).await?;
//! println!("{summary}");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancellationToken, RunContext};
    pub use crate::config::RunConfig;
    pub use crate::core::{
        Entity, InfraModel, ProgressEvent, ProgressPhase, Resource, ResourceKind, StageValue,
        ValueKind,
    };
    pub use crate::errors::{CancelCause, ConfigurationError, PipelineError, StageError};
    pub use crate::events::{
        ConsoleProgressReporter, LoggingProgressReporter, MemorySink, NoOpProgressReporter,
        ProgressReporter, ProgressSink, StderrSink, StdoutSink, TracingSink,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        BuiltinCatalog, Coordinator, OutputFormat, Pipeline, StageCatalog, WiredStage,
    };
    pub use crate::stages::{FnStage, Stage};
    pub use std::sync::Arc;
}
