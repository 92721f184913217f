//! Core domain model types for infragen.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Inter-stage values and their kinds
//! - The entity and resource model
//! - Progress events

mod event;
mod model;
mod value;

pub use event::{ProgressEvent, ProgressPhase};
pub use model::{Entity, InfraModel, Resource, ResourceKind};
pub use value::{StageValue, ValueKind};
