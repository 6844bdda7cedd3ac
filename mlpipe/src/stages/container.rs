//! Stages that run one command in a fresh container.

use super::{exit_to_output, runtime_error_to_output, Stage};
use crate::container::{render_command, RunRequest};
use crate::context::StageContext;
use crate::core::{StageKind, StageOutput};
use crate::errors::FailureKind;
use async_trait::async_trait;
use tracing::{info, warn};

/// Environment variable carrying the run id into the container.
pub const RUN_ID_ENV: &str = "PIPELINE_RUN_ID";
/// Environment variable carrying the stage name into the container.
pub const STAGE_ENV: &str = "PIPELINE_STAGE";

/// Name given to the container a stage runs in, unique per run.
#[must_use]
pub fn container_name(run_id: &str, stage: &str) -> String {
    format!("mlpipe-{run_id}-{stage}")
}

/// Runs a command inside the pipeline image with the working directories
/// mounted.
///
/// The request is a template: the run id and stage name are added as
/// environment variables on every execution, and the container is named
/// with [`container_name`] so a timed-out run can be killed.
#[derive(Debug, Clone)]
pub struct ContainerStage {
    name: String,
    request: RunRequest,
    program: String,
}

impl ContainerStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(name: impl Into<String>, request: RunRequest) -> Self {
        Self {
            name: name.into(),
            request,
            program: "docker".to_string(),
        }
    }

    /// Sets the program name shown by [`Stage::describe`].
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The request template.
    #[must_use]
    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    fn request_for(&self, ctx: &StageContext) -> RunRequest {
        self.request
            .clone()
            .with_name(container_name(&ctx.run_id(), ctx.stage_name()))
            .with_env(RUN_ID_ENV, ctx.run_id())
            .with_env(STAGE_ENV, ctx.stage_name())
    }
}

#[async_trait]
impl Stage for ContainerStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Container
    }

    fn describe(&self) -> String {
        self.request.command.join(" ")
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        let request = self.request_for(ctx);
        info!(
            stage = %self.name,
            command = %render_command(&self.program, &request.to_args()),
            "Running container"
        );
        match ctx.runtime().run(&request).await {
            Ok(exit) => exit_to_output(exit, FailureKind::StageExecution, &self.name),
            Err(e) => runtime_error_to_output(&e, FailureKind::StageExecution),
        }
    }

    async fn on_timeout(&self, ctx: &StageContext) {
        let name = container_name(&ctx.run_id(), ctx.stage_name());
        match ctx.runtime().kill(&name).await {
            Ok(()) => info!(stage = %self.name, container = %name, "Killed timed-out container"),
            Err(e) => warn!(stage = %self.name, container = %name, error = %e, "Failed to kill container"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::container::{MockContainerRuntime, Mount, ProcessExit};
    use crate::context::PipelineContext;
    use std::sync::Arc;

    fn train_request() -> RunRequest {
        RunRequest::new("ml-pipeline:latest")
            .with_mount(Mount::new("/work/test_models", "/app/models"))
            .with_env("PYTHONUNBUFFERED", "1")
            .with_command(["python", "train.py", "--model-output-path", "/app/models"])
    }

    fn context(runtime: MockContainerRuntime) -> StageContext {
        let pipeline = PipelineContext::new(PipelineConfig::default(), Arc::new(runtime));
        StageContext::new(Arc::new(pipeline), "train", 2)
    }

    #[tokio::test]
    async fn test_passes_run_env_and_mounts() {
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_run()
            .withf(|req: &RunRequest| {
                req.name.as_deref().is_some_and(|n| n.starts_with("mlpipe-") && n.ends_with("-train"))
                    && req.env.get(STAGE_ENV).map(String::as_str) == Some("train")
                    && req.env.contains_key(RUN_ID_ENV)
                    && req.env.get("PYTHONUNBUFFERED").map(String::as_str) == Some("1")
                    && req.mounts.len() == 1
                    && req.command[1] == "train.py"
            })
            .times(1)
            .returning(|_| Ok(ProcessExit::code(0)));

        let stage = ContainerStage::new("train", train_request());
        let output = stage.execute(&context(runtime)).await;

        assert!(output.is_success());
        assert_eq!(output.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_with_code() {
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_run()
            .returning(|_| Ok(ProcessExit::code(2)));

        let output = ContainerStage::new("train", train_request())
            .execute(&context(runtime))
            .await;

        assert_eq!(output.failure, Some(FailureKind::StageExecution));
        assert_eq!(output.propagated_exit_code(), 2);
        assert_eq!(output.error.as_deref(), Some("train exited with code 2"));
    }

    #[tokio::test]
    async fn test_timeout_kills_named_container() {
        let ctx = context({
            let mut runtime = MockContainerRuntime::new();
            runtime
                .expect_kill()
                .withf(|name: &str| name.starts_with("mlpipe-") && name.ends_with("-train"))
                .times(1)
                .returning(|_| Ok(()));
            runtime
        });

        ContainerStage::new("train", train_request()).on_timeout(&ctx).await;
    }

    #[test]
    fn test_container_name() {
        assert_eq!(container_name("0190", "predict"), "mlpipe-0190-predict");
    }

    #[test]
    fn test_describe_is_container_command() {
        let stage = ContainerStage::new("train", train_request());
        assert_eq!(stage.describe(), "python train.py --model-output-path /app/models");
    }
}
