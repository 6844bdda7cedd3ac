//! Scripted stages and a scripted container runtime for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::container::{BuildRequest, ContainerRuntime, ImageInfo, ProcessExit, RunRequest};
use crate::context::StageContext;
use crate::core::StageOutput;
use crate::errors::RuntimeError;
use crate::pipeline::stage_names;
use crate::stages::Stage;

/// A stage that records calls and returns a configurable output.
#[derive(Debug)]
pub struct ScriptedStage {
    name: String,
    output: Mutex<StageOutput>,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedStage {
    /// Creates a stage that succeeds.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: Mutex::new(StageOutput::ok()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the output to return.
    pub fn set_output(&self, output: StageOutput) {
        *self.output.lock() = output;
    }

    /// Returns the number of times the stage was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the position the stage ran at on each call.
    #[must_use]
    pub fn positions(&self) -> Vec<usize> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Stage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        self.calls.lock().push(ctx.position());
        self.output.lock().clone()
    }
}

/// A stage that sleeps before succeeding.
#[derive(Debug)]
pub struct SlowStage {
    name: String,
    delay: Duration,
}

impl SlowStage {
    /// Creates a new slow stage.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl Stage for SlowStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &StageContext) -> StageOutput {
        tokio::time::sleep(self.delay).await;
        StageOutput::ok()
    }
}

type RunHook = Arc<dyn Fn(&RunRequest) + Send + Sync>;

/// A [`ContainerRuntime`] that records requests and answers from a script.
///
/// Container runs are told apart by their `PIPELINE_STAGE` environment
/// variable. Everything succeeds unless scripted otherwise.
#[derive(Default)]
pub struct ScriptedRuntime {
    build_exit: Mutex<Option<ProcessExit>>,
    stage_exits: Mutex<HashMap<String, ProcessExit>>,
    hanging: Mutex<Vec<String>>,
    launch_fails: Mutex<bool>,
    env_output: Mutex<String>,
    on_run: Mutex<Option<RunHook>>,
    builds: Mutex<Vec<BuildRequest>>,
    runs: Mutex<Vec<RunRequest>>,
    kills: Mutex<Vec<String>>,
}

impl std::fmt::Debug for ScriptedRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRuntime")
            .field("builds", &self.builds.lock().len())
            .field("runs", &self.runs.lock().len())
            .finish_non_exhaustive()
    }
}

impl ScriptedRuntime {
    /// Creates a runtime where everything succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the image build exit with `exit`.
    pub fn fail_build(&self, exit: ProcessExit) {
        *self.build_exit.lock() = Some(exit);
    }

    /// Makes the container run for `stage` exit with `exit`.
    pub fn fail_stage(&self, stage: &str, exit: ProcessExit) {
        self.stage_exits.lock().insert(stage.to_string(), exit);
    }

    /// Makes the container run for `stage` never finish.
    pub fn hang_stage(&self, stage: &str) {
        self.hanging.lock().push(stage.to_string());
    }

    /// Makes every call fail as if the container CLI were not installed.
    pub fn fail_launch(&self) {
        *self.launch_fails.lock() = true;
    }

    /// Sets what `env` inside the container prints.
    pub fn set_env_output(&self, output: impl Into<String>) {
        *self.env_output.lock() = output.into();
    }

    /// Runs `hook` for every successful container run, before it returns.
    pub fn on_run(&self, hook: impl Fn(&RunRequest) + Send + Sync + 'static) {
        *self.on_run.lock() = Some(Arc::new(hook));
    }

    /// Makes the train and predict stages write their artifacts the way the
    /// real scripts do.
    pub fn produce_artifacts(&self, config: &PipelineConfig) {
        let model = config.model_artifact_path();
        let predictions = config.predictions_artifact_path();
        self.on_run(move |request| match stage_of(request) {
            Some(stage_names::TRAIN) => {
                if let Some(dir) = model.parent() {
                    let _ = std::fs::create_dir_all(dir);
                    let _ = std::fs::write(dir.join("metrics_20240101_000000.json"), r#"{"accuracy": 0.9}"#);
                }
                let _ = std::fs::write(&model, b"model");
            }
            Some(stage_names::PREDICT) => {
                if let Some(dir) = predictions.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                let _ = std::fs::write(&predictions, "id,prediction\n1,0\n2,1\n");
            }
            _ => {}
        });
    }

    /// Build requests received, in order.
    #[must_use]
    pub fn builds(&self) -> Vec<BuildRequest> {
        self.builds.lock().clone()
    }

    /// Run requests received, in order.
    #[must_use]
    pub fn runs(&self) -> Vec<RunRequest> {
        self.runs.lock().clone()
    }

    /// Container names passed to `kill`, in order.
    #[must_use]
    pub fn kills(&self) -> Vec<String> {
        self.kills.lock().clone()
    }

    /// `PIPELINE_STAGE` of every run request, in order.
    #[must_use]
    pub fn run_stages(&self) -> Vec<String> {
        self.runs
            .lock()
            .iter()
            .filter_map(|r| stage_of(r).map(str::to_string))
            .collect()
    }

    fn check_launch(&self) -> Result<(), RuntimeError> {
        if *self.launch_fails.lock() {
            return Err(RuntimeError::Launch {
                program: "docker".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(())
    }
}

fn stage_of(request: &RunRequest) -> Option<&str> {
    request
        .env
        .get(crate::stages::STAGE_ENV)
        .map(String::as_str)
}

#[async_trait]
impl ContainerRuntime for ScriptedRuntime {
    async fn build(&self, request: &BuildRequest) -> Result<ProcessExit, RuntimeError> {
        self.check_launch()?;
        self.builds.lock().push(request.clone());
        Ok(self.build_exit.lock().unwrap_or(ProcessExit::code(0)))
    }

    async fn run(&self, request: &RunRequest) -> Result<ProcessExit, RuntimeError> {
        self.check_launch()?;
        self.runs.lock().push(request.clone());

        let hangs = stage_of(request).is_some_and(|stage| self.hanging.lock().iter().any(|s| s == stage));
        if hangs {
            std::future::pending::<()>().await;
        }
        let exit = stage_of(request)
            .and_then(|stage| self.stage_exits.lock().get(stage).copied())
            .unwrap_or(ProcessExit::code(0));
        if exit.success() {
            let hook = self.on_run.lock().clone();
            if let Some(hook) = hook {
                hook(request);
            }
        }
        Ok(exit)
    }

    async fn capture(&self, _request: &RunRequest) -> Result<String, RuntimeError> {
        self.check_launch()?;
        Ok(self.env_output.lock().clone())
    }

    async fn inspect_image(&self, image: &str) -> Result<ImageInfo, RuntimeError> {
        self.check_launch()?;
        Ok(ImageInfo {
            id: "sha256:0000".to_string(),
            tags: vec![image.to_string()],
            os: "linux".to_string(),
            architecture: "amd64".to_string(),
            ..ImageInfo::default()
        })
    }

    async fn kill(&self, name: &str) -> Result<(), RuntimeError> {
        self.check_launch()?;
        self.kills.lock().push(name.to_string());
        Ok(())
    }
}
