//! Pipeline building and execution.
//!
//! This module provides:
//! - Stage specifications and the validating [`PipelineBuilder`]
//! - The fail-fast [`SequentialRunner`]
//! - The standard pipeline in [`ml_pipeline`]

mod builder;
mod plan;
mod result;
mod runner;
mod spec;

pub use builder::{Pipeline, PipelineBuilder};
pub use plan::{
    base_run_request, ml_pipeline, model_artifact, predictions_artifact, stage_names,
    PIPELINE_NAME,
};
pub use result::{PipelineRunResult, StageRunResult};
pub use runner::SequentialRunner;
pub use spec::StageSpec;
