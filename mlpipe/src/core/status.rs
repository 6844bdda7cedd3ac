//! Stage status and kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of work a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Prepares host-side state (working directories) before anything runs.
    Prepare,
    /// Builds the container image.
    Build,
    /// Runs a command inside the container image.
    Container,
    /// Checks that a stage left its contracted artifact behind.
    Verify,
    /// Prints diagnostics; never fails the run.
    Report,
    /// Offers to remove the working directories.
    Cleanup,
}

impl Default for StageKind {
    fn default() -> Self {
        Self::Container
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepare => write!(f, "prepare"),
            Self::Build => write!(f, "build"),
            Self::Container => write!(f, "container"),
            Self::Verify => write!(f, "verify"),
            Self::Report => write!(f, "report"),
            Self::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// The execution status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage completed successfully.
    Ok,
    /// Stage was skipped (e.g. the image build with `--no-build`).
    Skip,
    /// Stage failed.
    Fail,
    /// Stage never ran because an earlier stage failed.
    NotRun,
    /// Stage is pending execution.
    Pending,
    /// Stage is currently running.
    Running,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skip => write!(f, "skip"),
            Self::Fail => write!(f, "fail"),
            Self::NotRun => write!(f, "not_run"),
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ok | Self::Skip | Self::Fail | Self::NotRun)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Skip)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail)
    }
}
