//! Configuration for a local pipeline run.
//!
//! Everything has a default matching the conventional project layout, so an
//! empty `{}` config file (or no file at all) gives the standard
//! `test_data/`, `test_models/`, `test_predictions/` setup. A JSON file can
//! override any field; the CLI layers env vars and flags on top.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "mlpipe.json";

/// A host directory bind-mounted at a fixed path inside the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Host directory, relative to the working directory unless absolute.
    pub host: PathBuf,
    /// Absolute path inside the container.
    pub container: String,
}

impl MountConfig {
    /// Creates a new mount.
    #[must_use]
    pub fn new(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
        }
    }
}

/// Host/container directory layout shared by all container stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryLayout {
    /// Input data directory.
    #[serde(default = "default_data_mount")]
    pub data: MountConfig,
    /// Model output directory.
    #[serde(default = "default_models_mount")]
    pub models: MountConfig,
    /// Predictions output directory.
    #[serde(default = "default_predictions_mount")]
    pub predictions: MountConfig,
    /// File the training stage must leave in the models directory.
    #[serde(default = "default_model_file")]
    pub model_file: String,
    /// File the prediction stage must leave in the predictions directory.
    #[serde(default = "default_predictions_file")]
    pub predictions_file: String,
}

fn default_data_mount() -> MountConfig {
    MountConfig::new("test_data", "/app/data")
}

fn default_models_mount() -> MountConfig {
    MountConfig::new("test_models", "/app/models")
}

fn default_predictions_mount() -> MountConfig {
    MountConfig::new("test_predictions", "/app/predictions")
}

fn default_model_file() -> String {
    "latest_model.pkl".to_string()
}

fn default_predictions_file() -> String {
    "latest_predictions.csv".to_string()
}

impl Default for DirectoryLayout {
    fn default() -> Self {
        Self {
            data: default_data_mount(),
            models: default_models_mount(),
            predictions: default_predictions_mount(),
            model_file: default_model_file(),
            predictions_file: default_predictions_file(),
        }
    }
}

impl DirectoryLayout {
    /// All mounts, in the order they are passed to the container.
    #[must_use]
    pub fn mounts(&self) -> [&MountConfig; 3] {
        [&self.data, &self.models, &self.predictions]
    }

    /// Container path of the model file.
    #[must_use]
    pub fn container_model_path(&self) -> String {
        format!("{}/{}", self.models.container.trim_end_matches('/'), self.model_file)
    }
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Image name and tag to build and run.
    #[serde(default = "default_image")]
    pub image: String,
    /// Container CLI executable.
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
    /// Build context directory, relative to the working directory.
    #[serde(default = "default_build_context")]
    pub build_context: PathBuf,
    /// Dockerfile path passed with `-f`, if not the context default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<PathBuf>,
    /// Whether to build the image before running stages.
    #[serde(default = "default_build")]
    pub build: bool,
    /// Working directory that relative host paths resolve against.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    /// Host/container directory layout.
    #[serde(default)]
    pub layout: DirectoryLayout,
    /// Interpreter used to invoke the scripts inside the image.
    #[serde(default = "default_python")]
    pub python: String,
    /// When set, a prune stage keeps only this many old models/predictions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_count: Option<u32>,
    /// Per-stage timeout in seconds. Unset means wait forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_timeout_secs: Option<u64>,
    /// Extra environment variables passed into every container.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

fn default_image() -> String {
    "ml-pipeline:latest".to_string()
}

fn default_docker_bin() -> String {
    "docker".to_string()
}

fn default_build_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_build() -> bool {
    true
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

fn default_python() -> String {
    "python".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            docker_bin: default_docker_bin(),
            build_context: default_build_context(),
            dockerfile: None,
            build: default_build(),
            workdir: default_workdir(),
            layout: DirectoryLayout::default(),
            python: default_python(),
            keep_count: None,
            stage_timeout_secs: None,
            env: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `explicit` if given, otherwise `mlpipe.json` in `workdir` when
    /// it exists, otherwise defaults. The returned config's `workdir` is
    /// set to `workdir` unless the file set one.
    pub fn discover(explicit: Option<&Path>, workdir: &Path) -> Result<Self, ConfigError> {
        let candidate = workdir.join(DEFAULT_CONFIG_FILE);
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None if candidate.is_file() => Self::load(&candidate)?,
            None => Self::default(),
        };
        if config.workdir == default_workdir() {
            config.workdir = workdir.to_path_buf();
        }
        Ok(config)
    }

    /// Sets the image.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Sets the container CLI executable.
    #[must_use]
    pub fn with_docker_bin(mut self, docker_bin: impl Into<String>) -> Self {
        self.docker_bin = docker_bin.into();
        self
    }

    /// Enables or disables the image build.
    #[must_use]
    pub fn with_build(mut self, build: bool) -> Self {
        self.build = build;
        self
    }

    /// Enables the prune stage.
    #[must_use]
    pub fn with_keep_count(mut self, keep_count: u32) -> Self {
        self.keep_count = Some(keep_count);
        self
    }

    /// Adds an environment variable passed into every container.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Checks values serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image.trim().is_empty() {
            return Err(ConfigError::Invalid("image must not be empty".to_string()));
        }
        if self.docker_bin.trim().is_empty() {
            return Err(ConfigError::Invalid("docker_bin must not be empty".to_string()));
        }
        if self.keep_count == Some(0) {
            return Err(ConfigError::Invalid("keep_count must be at least 1".to_string()));
        }
        if self.stage_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "stage_timeout_secs must be greater than zero".to_string(),
            ));
        }
        for mount in self.layout.mounts() {
            if !mount.container.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "container path '{}' must be absolute",
                    mount.container
                )));
            }
        }
        for name in [&self.layout.model_file, &self.layout.predictions_file] {
            if name.is_empty() || name.contains('/') {
                return Err(ConfigError::Invalid(format!(
                    "artifact file name '{name}' must be a bare file name"
                )));
            }
        }
        Ok(())
    }

    /// Resolves a path against the working directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    /// Host directory of a mount, resolved against the working directory.
    #[must_use]
    pub fn host_dir(&self, mount: &MountConfig) -> PathBuf {
        self.resolve(&mount.host)
    }

    /// The working directories created before a run and offered for cleanup.
    #[must_use]
    pub fn working_dirs(&self) -> Vec<PathBuf> {
        self.layout.mounts().iter().map(|m| self.host_dir(m)).collect()
    }

    /// Host path of the model the training stage must produce.
    #[must_use]
    pub fn model_artifact_path(&self) -> PathBuf {
        self.host_dir(&self.layout.models).join(&self.layout.model_file)
    }

    /// Host path of the predictions the prediction stage must produce.
    #[must_use]
    pub fn predictions_artifact_path(&self) -> PathBuf {
        self.host_dir(&self.layout.predictions)
            .join(&self.layout.predictions_file)
    }

    /// Per-stage timeout, if configured.
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.image, "ml-pipeline:latest");
        assert_eq!(config.docker_bin, "docker");
        assert!(config.build);
        assert_eq!(config.layout.models.container, "/app/models");
        assert_eq!(config.layout.container_model_path(), "/app/models/latest_model.pkl");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_is_default() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.layout, DirectoryLayout::default());
        assert_eq!(config.image, PipelineConfig::default().image);
    }

    #[test]
    fn test_partial_layout_override() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"image": "ml:dev", "layout": {"models": {"host": "out/models", "container": "/models"}}}"#,
        )
        .unwrap();

        assert_eq!(config.image, "ml:dev");
        assert_eq!(config.layout.models.host, PathBuf::from("out/models"));
        assert_eq!(config.layout.data, default_data_mount());
        assert_eq!(config.layout.container_model_path(), "/models/latest_model.pkl");
    }

    #[test]
    fn test_paths_resolve_against_workdir() {
        let config = PipelineConfig::default().with_workdir("/work");
        assert_eq!(
            config.model_artifact_path(),
            PathBuf::from("/work/test_models/latest_model.pkl")
        );
        assert_eq!(
            config.predictions_artifact_path(),
            PathBuf::from("/work/test_predictions/latest_predictions.csv")
        );
        assert_eq!(
            config.working_dirs(),
            vec![
                PathBuf::from("/work/test_data"),
                PathBuf::from("/work/test_models"),
                PathBuf::from("/work/test_predictions"),
            ]
        );
        assert_eq!(config.resolve(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PipelineConfig::default().with_image("  ").validate().is_err());
        assert!(PipelineConfig::default().with_keep_count(0).validate().is_err());

        let mut config = PipelineConfig::default();
        config.layout.data.container = "app/data".to_string();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.layout.model_file = "sub/model.pkl".to_string();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.stage_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover_prefers_workdir_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), r#"{"image": "from-file:1"}"#)
            .unwrap();

        let config = PipelineConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.image, "from-file:1");
        assert_eq!(config.workdir, dir.path());
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.image, "ml-pipeline:latest");
        assert_eq!(config.workdir, dir.path());
    }

    #[test]
    fn test_discover_explicit_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::discover(Some(&dir.path().join("nope.json")), dir.path())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
