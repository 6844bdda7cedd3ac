//! Testing utilities for mlpipe pipelines.
//!
//! This module provides:
//! - Scripted stages and a scripted container runtime
//! - A harness wiring them into contexts
//! - Assertions over stage outputs and run results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_executed_stages, assert_output_failed, assert_output_succeeded, assert_stage_status,
};
pub use fixtures::TestHarness;
pub use mocks::{ScriptedRuntime, ScriptedStage, SlowStage};
