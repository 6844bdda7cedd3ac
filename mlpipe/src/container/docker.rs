//! [`ContainerRuntime`] backed by the `docker` command-line client.

use super::{render_command, BuildRequest, ContainerRuntime, ImageInfo, ProcessExit, RunRequest};
use crate::errors::RuntimeError;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs containers by shelling out to a Docker-compatible CLI.
///
/// Works with anything that accepts `docker`'s `build`, `run` and
/// `image inspect` syntax (e.g. `podman`).
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectOutput {
    id: String,
    #[serde(default)]
    created: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    os: String,
    #[serde(default)]
    architecture: String,
    #[serde(default)]
    repo_tags: Option<Vec<String>>,
}

impl DockerCli {
    /// Creates a client for `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The CLI executable.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).kill_on_drop(true);
        cmd
    }

    fn launch_error(&self, source: std::io::Error) -> RuntimeError {
        RuntimeError::Launch {
            program: self.program.clone(),
            source,
        }
    }

    async fn status(&self, args: Vec<String>) -> Result<ProcessExit, RuntimeError> {
        debug!(command = %render_command(&self.program, &args), "Spawning");
        let status = self
            .command(&args)
            .status()
            .await
            .map_err(|e| self.launch_error(e))?;
        Ok(ProcessExit::from(status))
    }

    async fn output(&self, args: Vec<String>) -> Result<String, RuntimeError> {
        let rendered = render_command(&self.program, &args);
        debug!(command = %rendered, "Capturing");
        let output = self
            .command(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;

        let exit = ProcessExit::from(output.status);
        if !exit.success() {
            return Err(RuntimeError::CommandFailed {
                command: rendered,
                exit_code: exit.exit_code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn build(&self, request: &BuildRequest) -> Result<ProcessExit, RuntimeError> {
        self.status(request.to_args()).await
    }

    async fn run(&self, request: &RunRequest) -> Result<ProcessExit, RuntimeError> {
        self.status(request.to_args()).await
    }

    async fn capture(&self, request: &RunRequest) -> Result<String, RuntimeError> {
        self.output(request.to_args()).await
    }

    async fn inspect_image(&self, image: &str) -> Result<ImageInfo, RuntimeError> {
        let args = vec![
            "image".to_string(),
            "inspect".to_string(),
            "--format".to_string(),
            "{{json .}}".to_string(),
            image.to_string(),
        ];
        let command = render_command(&self.program, &args);
        let stdout = self.output(args).await?;
        parse_inspect(&command, &stdout)
    }

    async fn kill(&self, name: &str) -> Result<(), RuntimeError> {
        self.output(vec!["kill".to_string(), name.to_string()])
            .await
            .map(|_| ())
    }
}

fn parse_inspect(command: &str, stdout: &str) -> Result<ImageInfo, RuntimeError> {
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| RuntimeError::Malformed {
            command: command.to_string(),
            reason: "empty output".to_string(),
        })?;
    let raw: InspectOutput = serde_json::from_str(line).map_err(|e| RuntimeError::Malformed {
        command: command.to_string(),
        reason: e.to_string(),
    })?;

    Ok(ImageInfo {
        id: raw.id,
        created: raw.created,
        size_bytes: raw.size,
        os: raw.os,
        architecture: raw.architecture,
        tags: raw.repo_tags.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inspect() {
        let stdout = r#"{"Id":"sha256:abc","Created":"2024-01-01T00:00:00Z","Size":1024,"Os":"linux","Architecture":"amd64","RepoTags":["ml-pipeline:latest"],"Config":{}}"#;
        let info = parse_inspect("docker image inspect", stdout).unwrap();

        assert_eq!(info.id, "sha256:abc");
        assert_eq!(info.size_bytes, 1024);
        assert_eq!(info.tags, vec!["ml-pipeline:latest"]);
    }

    #[test]
    fn test_parse_inspect_null_tags() {
        let info = parse_inspect("x", r#"{"Id":"sha256:def","RepoTags":null}"#).unwrap();
        assert!(info.tags.is_empty());
        assert_eq!(info.os, "");
    }

    #[test]
    fn test_parse_inspect_rejects_garbage() {
        assert!(matches!(
            parse_inspect("x", "\n\n"),
            Err(RuntimeError::Malformed { .. })
        ));
        assert!(matches!(
            parse_inspect("x", "[]"),
            Err(RuntimeError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let cli = DockerCli::new("/nonexistent/mlpipe-docker");
        let err = cli.run(&RunRequest::new("img")).await.unwrap_err();

        assert!(matches!(err, RuntimeError::Launch { .. }));
        assert_eq!(err.exit_code(), crate::errors::LAUNCH_FAILURE_EXIT_CODE);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_reports_nonzero_exit() {
        let cli = DockerCli::new("false");
        let err = cli.capture(&RunRequest::new("img")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::CommandFailed { exit_code: 1, .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_reports_failure() {
        let cli = DockerCli::new("false");
        let err = cli.kill("mlpipe-abc-train").await.unwrap_err();
        match err {
            RuntimeError::CommandFailed { command, .. } => {
                assert_eq!(command, "false kill mlpipe-abc-train");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_propagates_exit_status() {
        let cli = DockerCli::new("true");
        let exit = cli.run(&RunRequest::new("img")).await.unwrap();
        assert!(exit.success());
    }
}
