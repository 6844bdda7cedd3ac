//! Stage trait and implementations.
//!
//! A stage is one step of the verification pipeline. Stages that touch a
//! container go through [`crate::container::ContainerRuntime`] on the
//! [`StageContext`], so every stage here can be exercised without Docker.

mod build;
mod cleanup;
mod container;
mod prepare;
mod report;
mod verify;

pub use build::ImageBuildStage;
pub use cleanup::CleanupStage;
pub use container::{container_name, ContainerStage, RUN_ID_ENV, STAGE_ENV};
pub use prepare::PrepareStage;
pub use report::{DiagnosticReport, DirEntryInfo, DirListing, ReportStage};
pub use verify::{ArtifactVerifier, ExpectedArtifact, VerifyArtifactStage};

use crate::container::ProcessExit;
use crate::context::StageContext;
use crate::core::{StageKind, StageOutput};
use crate::errors::{FailureKind, RuntimeError};
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Returns the kind of work the stage performs.
    fn kind(&self) -> StageKind {
        StageKind::Container
    }

    /// One-line human description used by `plan`, usually the command line.
    fn describe(&self) -> String {
        String::new()
    }

    /// Executes the stage.
    ///
    /// Failures are reported through the returned [`StageOutput`], never by
    /// panicking.
    async fn execute(&self, ctx: &StageContext) -> StageOutput;

    /// Called after the runner abandoned [`Stage::execute`] because it ran
    /// past the stage timeout. Stages that start work outside this process
    /// stop it here.
    async fn on_timeout(&self, _ctx: &StageContext) {}
}

/// Maps a finished child process to a stage output.
pub(crate) fn exit_to_output(exit: ProcessExit, kind: FailureKind, what: &str) -> StageOutput {
    if exit.success() {
        return StageOutput::exited_ok();
    }
    let message = match exit.signal {
        Some(signal) => format!("{what} was killed by signal {signal}"),
        None => format!("{what} exited with code {}", exit.exit_code()),
    };
    StageOutput::fail(kind, Some(exit.exit_code()), message)
}

/// Maps a runtime error to a stage output. Launch errors keep their own
/// classification; anything else is charged to `kind`.
pub(crate) fn runtime_error_to_output(err: &RuntimeError, kind: FailureKind) -> StageOutput {
    let kind = match err {
        RuntimeError::Launch { .. } => FailureKind::Launch,
        _ => kind,
    };
    StageOutput::fail(kind, Some(err.exit_code()), err.to_string())
}
