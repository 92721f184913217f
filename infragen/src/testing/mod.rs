//! Testing utilities for infragen pipelines.
//!
//! This module provides:
//! - Mock stages covering success, failure, slowness and panics
//! - A progress reporter that records events
//! - Assertions over recorded lifecycles

mod assertions;
mod mocks;
mod recorder;

pub use assertions::{assert_lifecycle_order, assert_no_stage_started, assert_single_terminal};
pub use mocks::{
    AppendNameStage, FailingStage, PanickingStage, PassThroughStage, SlowStage, StubbornStage,
};
pub use recorder::RecordingProgressReporter;
