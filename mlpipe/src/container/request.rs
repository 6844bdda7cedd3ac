//! Build and run requests, rendered to container CLI arguments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A bind mount from a host directory to a container path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Absolute host path.
    pub host: PathBuf,
    /// Absolute container path.
    pub container: String,
    /// Mount read-only.
    #[serde(default)]
    pub read_only: bool,
}

impl Mount {
    /// Creates a read-write bind mount.
    #[must_use]
    pub fn new(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            read_only: false,
        }
    }

    /// The `-v` argument value.
    #[must_use]
    pub fn to_volume_arg(&self) -> String {
        let mut arg = format!("{}:{}", self.host.display(), self.container);
        if self.read_only {
            arg.push_str(":ro");
        }
        arg
    }
}

/// A request to build an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Tag to apply to the built image.
    pub image: String,
    /// Build context directory.
    pub context: PathBuf,
    /// Dockerfile, when not `<context>/Dockerfile`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<PathBuf>,
}

impl BuildRequest {
    /// Creates a build request.
    #[must_use]
    pub fn new(image: impl Into<String>, context: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            context: context.into(),
            dockerfile: None,
        }
    }

    /// Sets the Dockerfile.
    #[must_use]
    pub fn with_dockerfile(mut self, dockerfile: impl Into<PathBuf>) -> Self {
        self.dockerfile = Some(dockerfile.into());
        self
    }

    /// Arguments after the CLI program name.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["build".to_string(), "-t".to_string(), self.image.clone()];
        if let Some(ref dockerfile) = self.dockerfile {
            args.push("-f".to_string());
            args.push(dockerfile.display().to_string());
        }
        args.push(self.context.display().to_string());
        args
    }
}

/// A request to run a command in a fresh container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Image to run.
    pub image: String,
    /// Container name, so the container can be stopped from outside.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Bind mounts, in order.
    #[serde(default)]
    pub mounts: Vec<Mount>,
    /// Environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Command and arguments run inside the container.
    #[serde(default)]
    pub command: Vec<String>,
    /// Remove the container when it exits.
    #[serde(default = "default_remove")]
    pub remove: bool,
}

fn default_remove() -> bool {
    true
}

impl RunRequest {
    /// Creates a run request with no mounts, env or command.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: None,
            mounts: Vec::new(),
            env: BTreeMap::new(),
            command: Vec::new(),
            remove: true,
        }
    }

    /// Names the container.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a mount.
    #[must_use]
    pub fn with_mount(mut self, mount: Mount) -> Self {
        self.mounts.push(mount);
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the command.
    #[must_use]
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments after the CLI program name.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        if self.remove {
            args.push("--rm".to_string());
        }
        if let Some(ref name) = self.name {
            args.push("--name".to_string());
            args.push(name.clone());
        }
        for mount in &self.mounts {
            args.push("-v".to_string());
            args.push(mount.to_volume_arg());
        }
        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// Renders a command line for logs and diagnostics.
#[must_use]
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut out = String::from(program);
    for arg in args {
        out.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            out.push('\'');
            out.push_str(arg);
            out.push('\'');
        } else {
            out.push_str(arg);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_args() {
        let request = BuildRequest::new("ml-pipeline:latest", ".");
        assert_eq!(request.to_args(), vec!["build", "-t", "ml-pipeline:latest", "."]);

        let request = request.with_dockerfile("docker/Dockerfile");
        assert_eq!(
            request.to_args(),
            vec!["build", "-t", "ml-pipeline:latest", "-f", "docker/Dockerfile", "."]
        );
    }

    #[test]
    fn test_run_args_order() {
        let request = RunRequest::new("ml-pipeline:latest")
            .with_mount(Mount::new("/work/test_models", "/app/models"))
            .with_env("PYTHONUNBUFFERED", "1")
            .with_env("PIPELINE_STAGE", "train")
            .with_command(["python", "train.py", "--model-output-path", "/app/models"]);

        assert_eq!(
            request.to_args(),
            vec![
                "run",
                "--rm",
                "-v",
                "/work/test_models:/app/models",
                "-e",
                "PIPELINE_STAGE=train",
                "-e",
                "PYTHONUNBUFFERED=1",
                "ml-pipeline:latest",
                "python",
                "train.py",
                "--model-output-path",
                "/app/models",
            ]
        );
    }

    #[test]
    fn test_named_run_args() {
        let request = RunRequest::new("img")
            .with_name("mlpipe-abc-train")
            .with_command(["true"]);
        assert_eq!(
            request.to_args(),
            vec!["run", "--rm", "--name", "mlpipe-abc-train", "img", "true"]
        );
    }

    #[test]
    fn test_read_only_mount() {
        let mut mount = Mount::new("/data", "/app/data");
        mount.read_only = true;
        assert_eq!(mount.to_volume_arg(), "/data:/app/data:ro");
    }

    #[test]
    fn test_render_command_quotes_spaces() {
        let args = vec!["run".to_string(), "a b".to_string(), String::new()];
        assert_eq!(render_command("docker", &args), "docker run 'a b' ''");
    }
}
