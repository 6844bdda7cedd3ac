//! The standard build-and-test pipeline.

use super::{Pipeline, PipelineBuilder};
use crate::cleanup::Confirm;
use crate::config::PipelineConfig;
use crate::container::{BuildRequest, Mount, RunRequest};
use crate::errors::PipelineValidationError;
use crate::stages::{
    CleanupStage, ContainerStage, ExpectedArtifact, ImageBuildStage, PrepareStage, ReportStage,
    Stage, VerifyArtifactStage,
};
use std::sync::Arc;

/// Name of the standard pipeline.
pub const PIPELINE_NAME: &str = "ml-pipeline";

/// Stage names of the standard pipeline.
pub mod stage_names {
    /// Creates the working directories.
    pub const PREPARE: &str = "prepare-workspace";
    /// Builds the image.
    pub const BUILD: &str = "build-image";
    /// Trains the model.
    pub const TRAIN: &str = "train";
    /// Checks the model file exists.
    pub const VERIFY_MODEL: &str = "verify-model";
    /// Writes predictions.
    pub const PREDICT: &str = "predict";
    /// Checks the predictions file exists.
    pub const VERIFY_PREDICTIONS: &str = "verify-predictions";
    /// Runs the model validation script.
    pub const VALIDATE_MODEL: &str = "validate-model";
    /// Runs the predictions validation script.
    pub const VALIDATE_PREDICTIONS: &str = "validate-predictions";
    /// Prunes old models and predictions.
    pub const PRUNE: &str = "prune";
    /// Prints diagnostics.
    pub const REPORT: &str = "report";
    /// Offers to remove the working directories.
    pub const CLEANUP: &str = "cleanup";
}

use stage_names as names;

/// The expected model artifact.
#[must_use]
pub fn model_artifact(config: &PipelineConfig) -> ExpectedArtifact {
    ExpectedArtifact::new("model", config.model_artifact_path())
}

/// The expected predictions artifact.
#[must_use]
pub fn predictions_artifact(config: &PipelineConfig) -> ExpectedArtifact {
    ExpectedArtifact::new("predictions", config.predictions_artifact_path())
}

/// Template for every container stage: working directories mounted,
/// unbuffered Python output and any configured extra environment.
#[must_use]
pub fn base_run_request(config: &PipelineConfig) -> RunRequest {
    let mut request = RunRequest::new(&config.image);
    for mount in config.layout.mounts() {
        request = request.with_mount(Mount::new(config.host_dir(mount), &mount.container));
    }
    request = request.with_env("PYTHONUNBUFFERED", "1");
    for (key, value) in &config.env {
        request = request.with_env(key, value);
    }
    request
}

fn container_stage(config: &PipelineConfig, name: &str, script: &str, args: &[String]) -> ContainerStage {
    let mut command = vec![config.python.clone(), script.to_string()];
    command.extend(args.iter().cloned());
    ContainerStage::new(name, base_run_request(config).with_command(command))
        .with_program(&config.docker_bin)
}

/// Assembles the standard pipeline:
///
/// prepare-workspace, build-image, train, verify-model, predict,
/// verify-predictions, validate-model, validate-predictions, an optional
/// prune, report, cleanup.
///
/// # Errors
///
/// Returns an error if the assembled pipeline does not validate.
pub fn ml_pipeline(
    config: &PipelineConfig,
    confirm: Arc<dyn Confirm>,
) -> Result<Pipeline, PipelineValidationError> {
    let layout = &config.layout;
    let models = layout.models.container.clone();
    let predictions = layout.predictions.container.clone();

    let mut build = BuildRequest::new(&config.image, config.resolve(&config.build_context));
    if let Some(ref dockerfile) = config.dockerfile {
        build = build.with_dockerfile(config.resolve(dockerfile));
    }

    PipelineBuilder::new(PIPELINE_NAME)
        .stage(Arc::new(PrepareStage::new(names::PREPARE)))
        .stage(Arc::new(
            ImageBuildStage::new(names::BUILD, build)
                .enabled(config.build)
                .with_program(&config.docker_bin),
        ))
        .stage(Arc::new(container_stage(
            config,
            names::TRAIN,
            "train.py",
            &["--model-output-path".to_string(), models.clone()],
        )))
        .stage(Arc::new(VerifyArtifactStage::new(
            names::VERIFY_MODEL,
            model_artifact(config),
        )))
        .stage(Arc::new(container_stage(
            config,
            names::PREDICT,
            "predict.py",
            &[
                "--model-path".to_string(),
                layout.container_model_path(),
                "--output-path".to_string(),
                predictions.clone(),
            ],
        )))
        .stage(Arc::new(VerifyArtifactStage::new(
            names::VERIFY_PREDICTIONS,
            predictions_artifact(config),
        )))
        .stage(Arc::new(container_stage(
            config,
            names::VALIDATE_MODEL,
            "validate.py",
            &["validate-model".to_string(), "--models-dir".to_string(), models.clone()],
        )))
        .stage(Arc::new(container_stage(
            config,
            names::VALIDATE_PREDICTIONS,
            "validate.py",
            &[
                "validate-predictions".to_string(),
                "--predictions-dir".to_string(),
                predictions.clone(),
            ],
        )))
        .stage_if(config.keep_count.is_some(), || -> Arc<dyn Stage> {
            let keep = config.keep_count.unwrap_or_default().to_string();
            Arc::new(container_stage(
                config,
                names::PRUNE,
                "validate.py",
                &[
                    "cleanup".to_string(),
                    "--models-dir".to_string(),
                    models.clone(),
                    "--predictions-dir".to_string(),
                    predictions.clone(),
                    "--keep-count".to_string(),
                    keep,
                ],
            ))
        })
        .stage(Arc::new(ReportStage::new(
            names::REPORT,
            &config.image,
            model_artifact(config),
            predictions_artifact(config),
        )))
        .stage(Arc::new(CleanupStage::new(names::CLEANUP, confirm)))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::FixedAnswer;
    use crate::core::StageKind;
    use pretty_assertions::assert_eq;

    fn config() -> PipelineConfig {
        PipelineConfig::default().with_workdir("/work")
    }

    #[test]
    fn test_standard_order() {
        let pipeline = ml_pipeline(&config(), Arc::new(FixedAnswer(false))).unwrap();

        assert_eq!(
            pipeline.stage_names(),
            vec![
                "prepare-workspace",
                "build-image",
                "train",
                "verify-model",
                "predict",
                "verify-predictions",
                "validate-model",
                "validate-predictions",
                "report",
                "cleanup",
            ]
        );
        let kinds: Vec<StageKind> = pipeline.stages().iter().map(|s| s.kind).collect();
        assert_eq!(kinds[1], StageKind::Build);
        assert_eq!(kinds[3], StageKind::Verify);
        assert_eq!(kinds[9], StageKind::Cleanup);
    }

    #[test]
    fn test_stage_commands() {
        let pipeline = ml_pipeline(&config(), Arc::new(FixedAnswer(false))).unwrap();
        let describe = |name: &str| pipeline.stage(name).unwrap().description.clone();

        assert_eq!(describe("train"), "python train.py --model-output-path /app/models");
        assert_eq!(
            describe("predict"),
            "python predict.py --model-path /app/models/latest_model.pkl --output-path /app/predictions"
        );
        assert_eq!(
            describe("validate-model"),
            "python validate.py validate-model --models-dir /app/models"
        );
        assert_eq!(
            describe("validate-predictions"),
            "python validate.py validate-predictions --predictions-dir /app/predictions"
        );
        assert_eq!(describe("verify-model"), "test -f /work/test_models/latest_model.pkl");
        assert_eq!(describe("build-image"), "docker build -t ml-pipeline:latest /work/.");
    }

    #[test]
    fn test_keep_count_adds_prune() {
        let pipeline = ml_pipeline(&config().with_keep_count(3), Arc::new(FixedAnswer(false))).unwrap();
        let prune = pipeline.stage("prune").unwrap();

        assert_eq!(
            prune.description,
            "python validate.py cleanup --models-dir /app/models --predictions-dir /app/predictions --keep-count 3"
        );
        let names = pipeline.stage_names();
        assert_eq!(names[names.len() - 3], "prune");
    }

    #[test]
    fn test_base_request_mounts_and_env() {
        let request = base_run_request(&config().with_env("MODEL_TYPE", "random_forest"));
        let volumes: Vec<String> = request.mounts.iter().map(|m| m.to_volume_arg()).collect();

        assert_eq!(
            volumes,
            vec![
                "/work/test_data:/app/data",
                "/work/test_models:/app/models",
                "/work/test_predictions:/app/predictions",
            ]
        );
        assert_eq!(request.env.get("PYTHONUNBUFFERED").map(String::as_str), Some("1"));
        assert_eq!(request.env.get("MODEL_TYPE").map(String::as_str), Some("random_forest"));
    }
}
