//! Image build stage.

use super::{exit_to_output, runtime_error_to_output, Stage};
use crate::container::{render_command, BuildRequest};
use crate::context::StageContext;
use crate::core::{StageKind, StageOutput};
use crate::errors::FailureKind;
use async_trait::async_trait;
use tracing::info;

/// Builds the image every later stage runs in.
///
/// When the run is configured not to build, the stage is recorded as
/// skipped and the existing image is used as is.
#[derive(Debug, Clone)]
pub struct ImageBuildStage {
    name: String,
    request: BuildRequest,
    enabled: bool,
    program: String,
}

impl ImageBuildStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(name: impl Into<String>, request: BuildRequest) -> Self {
        Self {
            name: name.into(),
            request,
            enabled: true,
            program: "docker".to_string(),
        }
    }

    /// Enables or disables the build.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the program name shown by [`Stage::describe`].
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The build request.
    #[must_use]
    pub fn request(&self) -> &BuildRequest {
        &self.request
    }
}

#[async_trait]
impl Stage for ImageBuildStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Build
    }

    fn describe(&self) -> String {
        let command = render_command(&self.program, &self.request.to_args());
        if self.enabled {
            command
        } else {
            format!("(skipped) {command}")
        }
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        if !self.enabled {
            return StageOutput::skip(format!("image build disabled, reusing {}", self.request.image));
        }

        info!(image = %self.request.image, context = %self.request.context.display(), "Building image");
        match ctx.runtime().build(&self.request).await {
            Ok(exit) => exit_to_output(exit, FailureKind::Build, "docker build"),
            Err(e) => runtime_error_to_output(&e, FailureKind::Build),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ProcessExit;
    use crate::core::StageStatus;
    use crate::testing::TestHarness;

    fn stage() -> ImageBuildStage {
        ImageBuildStage::new("build-image", BuildRequest::new("ml-pipeline:latest", "/src"))
    }

    #[tokio::test]
    async fn test_build_success() {
        let harness = TestHarness::new();
        let output = stage().execute(&harness.stage_context("build-image", 1)).await;

        assert_eq!(output.status, StageStatus::Ok);
        assert_eq!(harness.runtime().builds().len(), 1);
        assert_eq!(harness.runtime().builds()[0].image, "ml-pipeline:latest");
    }

    #[tokio::test]
    async fn test_build_failure_propagates_code() {
        let harness = TestHarness::new();
        harness.runtime().fail_build(ProcessExit::code(3));

        let output = stage().execute(&harness.stage_context("build-image", 1)).await;

        assert_eq!(output.failure, Some(FailureKind::Build));
        assert_eq!(output.propagated_exit_code(), 3);
    }

    #[tokio::test]
    async fn test_disabled_build_skips() {
        let harness = TestHarness::new();
        let stage = stage().enabled(false);

        let output = stage.execute(&harness.stage_context("build-image", 1)).await;

        assert_eq!(output.status, StageStatus::Skip);
        assert!(harness.runtime().builds().is_empty());
        assert!(stage.describe().starts_with("(skipped) docker build"));
    }

    #[tokio::test]
    async fn test_missing_docker_is_launch_failure() {
        let harness = TestHarness::new();
        harness.runtime().fail_launch();

        let output = stage().execute(&harness.stage_context("build-image", 1)).await;

        assert_eq!(output.failure, Some(FailureKind::Launch));
        assert_eq!(output.propagated_exit_code(), 127);
    }
}
