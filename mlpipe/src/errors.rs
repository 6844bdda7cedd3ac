//! Error types for mlpipe.
//!
//! Two families live here. [`FailureKind`] classifies why a *stage* failed;
//! stage failures are data carried in [`crate::core::StageOutput`], not Rust
//! errors. [`MlpipeError`] and friends cover everything that stops the tool
//! itself from working: bad configuration, an invalid pipeline definition, a
//! container CLI that cannot be reached.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code used when a failure has no process exit status of its own.
pub const GENERIC_FAILURE_EXIT_CODE: i32 = 1;

/// Exit code used when the container CLI could not be launched at all.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 127;

/// Why a stage failed. Every class is fatal to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The image build exited nonzero.
    Build,
    /// A stage's process exited nonzero.
    StageExecution,
    /// A stage succeeded but its contracted artifact is not on disk.
    MissingArtifact,
    /// The container CLI could not be spawned or inspected.
    Launch,
    /// The stage exceeded its configured timeout.
    Timeout,
}

impl FailureKind {
    /// The label printed in front of the diagnostic for this failure class.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Build => "BUILD FAILED",
            Self::StageExecution => "STAGE FAILED",
            Self::MissingArtifact => "MISSING ARTIFACT",
            Self::Launch => "LAUNCH FAILED",
            Self::Timeout => "TIMED OUT",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::StageExecution => write!(f, "stage_execution"),
            Self::MissingArtifact => write!(f, "missing_artifact"),
            Self::Launch => write!(f, "launch"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// The main error type for mlpipe operations.
#[derive(Debug, Error)]
pub enum MlpipeError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The container runtime misbehaved.
    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when a pipeline definition is rejected by the builder.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Stable machine-readable code (e.g. `PIPELINE-EMPTY`).
    pub code: Option<String>,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            code: None,
            fix_hint: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("stages".to_string(), serde_json::json!(self.stages));
        if let Some(ref code) = self.code {
            map.insert("code".to_string(), serde_json::json!(code));
        }
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        map
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        /// The config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the expected shape.
    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        /// The config file path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A value is present but unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by a container runtime implementation.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The container CLI could not be spawned.
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        /// The program that failed to start.
        program: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A command whose output we needed exited nonzero.
    #[error("'{command}' exited with status {exit_code}: {stderr}")]
    CommandFailed {
        /// The rendered command line.
        command: String,
        /// The exit code of the command.
        exit_code: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The command produced output we could not make sense of.
    #[error("Unexpected output from '{command}': {reason}")]
    Malformed {
        /// The rendered command line.
        command: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl RuntimeError {
    /// The exit code a run should report when this error aborts a stage.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Launch { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                LAUNCH_FAILURE_EXIT_CODE
            }
            Self::CommandFailed { exit_code, .. } if *exit_code != 0 => *exit_code,
            _ => GENERIC_FAILURE_EXIT_CODE,
        }
    }
}

/// Result type alias for mlpipe operations.
pub type Result<T> = std::result::Result<T, MlpipeError>;
