//! Context handed to stages while a pipeline runs.
//!
//! - [`RunIdentity`] names one execution of a pipeline
//! - [`PipelineContext`] owns the shared configuration, container runtime and event sink
//! - [`StageContext`] is the per-stage view a [`crate::stages::Stage`] receives

mod execution;
mod identity;

pub use execution::{PipelineContext, StageContext};
pub use identity::RunIdentity;
