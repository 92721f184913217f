//! Cooperative cancellation for pipeline runs.
//!
//! This module provides:
//! - CancellationToken for cooperative, awaitable cancellation
//! - RunContext combining a token with an optional deadline

mod context;
mod token;

pub use context::RunContext;
pub use token::{CallbackId, CancelCallback, CancellationToken};
