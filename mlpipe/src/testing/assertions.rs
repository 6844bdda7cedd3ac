//! Test assertions for run results.

use crate::core::{StageOutput, StageStatus};
use crate::pipeline::PipelineRunResult;

/// Asserts that the output indicates success.
pub fn assert_output_succeeded(output: &StageOutput) {
    assert!(
        output.is_success(),
        "Expected success, got status: {:?} ({:?})",
        output.status,
        output.error
    );
}

/// Asserts that the output indicates failure.
pub fn assert_output_failed(output: &StageOutput) {
    assert!(
        output.is_failure(),
        "Expected failure, got status: {:?}",
        output.status
    );
}

/// Asserts the status of a named stage in a run.
pub fn assert_stage_status(result: &PipelineRunResult, stage: &str, expected: StageStatus) {
    let actual = result
        .stage(stage)
        .unwrap_or_else(|| panic!("Stage '{stage}' is not part of the run"))
        .status;
    assert_eq!(
        actual, expected,
        "Expected stage '{stage}' to be {expected:?}, got {actual:?}"
    );
}

/// Asserts exactly which stages ran, in order.
pub fn assert_executed_stages(result: &PipelineRunResult, expected: &[&str]) {
    assert_eq!(
        result.executed_stages(),
        expected,
        "Unexpected executed stages"
    );
}
