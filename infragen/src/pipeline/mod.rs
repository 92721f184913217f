//! Pipeline wiring and execution.
//!
//! This module provides:
//! - The sequential [`Pipeline`] executor
//! - The [`StageCatalog`] the coordinator draws stages from
//! - The [`Coordinator`] that validates a run and interprets its result

mod catalog;
mod coordinator;
mod executor;


pub use catalog::{check_chain, BuiltinCatalog, OutputFormat, StageCatalog, WiredStage};
pub use coordinator::{summarize, Coordinator, InputSource, ValidatedRun};
pub use executor::{ErrorHandler, Pipeline, DEFAULT_ABANDON_GRACE};
