//! Stage output type with factory methods.

use super::{StageArtifact, StageStatus};
use crate::errors::{FailureKind, GENERIC_FAILURE_EXIT_CODE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The output of a stage execution.
///
/// `StageOutput` is immutable once created and provides factory methods
/// for creating outputs with different statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    /// The status of the stage execution.
    pub status: StageStatus,

    /// Exit code of the stage's child process, if it had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Failure classification (for failed executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,

    /// Artifacts checked by the stage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<StageArtifact>,

    /// Additional metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Error message (for failed executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Skip reason (for skipped executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl Default for StageOutput {
    fn default() -> Self {
        Self::ok()
    }
}

impl StageOutput {
    /// Creates a successful output.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: StageStatus::Ok,
            exit_code: None,
            failure: None,
            artifacts: Vec::new(),
            metadata: HashMap::new(),
            error: None,
            skip_reason: None,
        }
    }

    /// Creates a successful output for a child process that exited 0.
    #[must_use]
    pub fn exited_ok() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::ok()
        }
    }

    /// Creates a skip output with a reason.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skip,
            skip_reason: Some(reason.into()),
            ..Self::ok()
        }
    }

    /// Creates a failure output.
    ///
    /// `exit_code` is the code the run should propagate; zero or a missing
    /// code is normalized to the generic failure code.
    #[must_use]
    pub fn fail(kind: FailureKind, exit_code: Option<i32>, error: impl Into<String>) -> Self {
        let exit_code = match exit_code {
            Some(code) if code != 0 => code,
            _ => GENERIC_FAILURE_EXIT_CODE,
        };
        Self {
            status: StageStatus::Fail,
            exit_code: Some(exit_code),
            failure: Some(kind),
            error: Some(error.into()),
            ..Self::ok()
        }
    }

    /// Creates a failure output for a contracted artifact that is absent.
    #[must_use]
    pub fn missing_artifact(artifact: StageArtifact) -> Self {
        let error = format!("Expected artifact not found: {}", artifact.path.display());
        Self::fail(FailureKind::MissingArtifact, None, error).with_artifacts(vec![artifact])
    }

    /// Adds artifacts to the output.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Vec<StageArtifact>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn add_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true if the output indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the output indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// The exit code a run should report if it stops at this output.
    #[must_use]
    pub fn propagated_exit_code(&self) -> i32 {
        if self.is_failure() {
            self.exit_code.filter(|c| *c != 0).unwrap_or(GENERIC_FAILURE_EXIT_CODE)
        } else {
            0
        }
    }

    /// Gets a metadata value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}
