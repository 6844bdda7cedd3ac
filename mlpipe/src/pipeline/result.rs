//! Per-stage and per-run results.

use crate::core::{StageArtifact, StageKind, StageOutput, StageStatus};
use crate::errors::FailureKind;
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// What happened to one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRunResult {
    /// Stage name.
    pub name: String,
    /// Zero-based position in the pipeline.
    pub position: usize,
    /// Stage kind.
    pub kind: StageKind,
    /// Final status.
    pub status: StageStatus,
    /// Exit code of the stage's child process, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Failure classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// When the stage started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// When the stage ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<Timestamp>,
    /// Wall-clock duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Skip reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Artifacts the stage checked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<StageArtifact>,
    /// Stage metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StageRunResult {
    /// Records a stage that executed.
    #[must_use]
    pub fn executed(
        name: impl Into<String>,
        position: usize,
        kind: StageKind,
        output: StageOutput,
        started_at: Timestamp,
        ended_at: Timestamp,
        duration_ms: f64,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            kind,
            status: output.status,
            exit_code: output.exit_code,
            failure: output.failure,
            started_at: Some(started_at),
            ended_at: Some(ended_at),
            duration_ms: Some(duration_ms),
            error: output.error,
            skip_reason: output.skip_reason,
            artifacts: output.artifacts,
            metadata: output.metadata,
        }
    }

    /// Records a stage that never ran because an earlier stage failed.
    #[must_use]
    pub fn not_run(name: impl Into<String>, position: usize, kind: StageKind) -> Self {
        Self {
            name: name.into(),
            position,
            kind,
            status: StageStatus::NotRun,
            exit_code: None,
            failure: None,
            started_at: None,
            ended_at: None,
            duration_ms: None,
            error: None,
            skip_reason: None,
            artifacts: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Returns true if the stage ran (whatever the outcome).
    #[must_use]
    pub fn was_executed(&self) -> bool {
        self.started_at.is_some()
    }
}

/// What happened to a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunResult {
    /// Run id.
    pub run_id: Uuid,
    /// Pipeline name.
    pub pipeline: String,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run ended.
    pub ended_at: Timestamp,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// True if every stage succeeded or was skipped.
    pub success: bool,
    /// Stage results in pipeline order, including stages that never ran.
    pub stages: Vec<StageRunResult>,
    /// Name of the stage that stopped the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    /// Classification of the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Process exit code the run maps to.
    pub exit_code: i32,
}

impl PipelineRunResult {
    /// Returns a stage result by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageRunResult> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Names of the stages that ran, in order.
    #[must_use]
    pub fn executed_stages(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| s.was_executed())
            .map(|s| s.name.as_str())
            .collect()
    }

    /// The labeled diagnostic for a failed run, e.g.
    /// `MISSING ARTIFACT: verify-model: Expected artifact not found: ...`.
    #[must_use]
    pub fn diagnostic(&self) -> Option<String> {
        let kind = self.failure?;
        let stage = self.failed_stage.as_deref().unwrap_or("pipeline");
        let detail = self
            .stage(stage)
            .and_then(|s| s.error.as_deref())
            .unwrap_or("stage failed");
        Some(format!("{}: {stage}: {detail}", kind.label()))
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
