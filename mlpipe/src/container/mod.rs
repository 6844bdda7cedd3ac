//! Container runtime port.
//!
//! Stages never spawn processes themselves; they describe what they want as a
//! [`BuildRequest`] or [`RunRequest`] and hand it to a [`ContainerRuntime`].
//! [`DockerCli`] is the real implementation, tests substitute their own.

mod docker;
mod request;

pub use docker::DockerCli;
pub use request::{render_command, BuildRequest, Mount, RunRequest};

use crate::errors::{RuntimeError, GENERIC_FAILURE_EXIT_CODE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessExit {
    /// Exit code, when the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, when the process was killed.
    pub signal: Option<i32>,
}

impl ProcessExit {
    /// A normal exit with `code`.
    #[must_use]
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Death by signal `signal`.
    #[must_use]
    pub fn signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Returns true if the process exited 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The exit code as a shell would report it: the code itself, or
    /// 128 + signal for a killed process.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => GENERIC_FAILURE_EXIT_CODE,
        }
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Image metadata reported by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Content-addressed image id.
    pub id: String,
    /// Creation time as reported by the runtime.
    pub created: String,
    /// Image size in bytes.
    pub size_bytes: u64,
    /// Operating system.
    pub os: String,
    /// CPU architecture.
    pub architecture: String,
    /// Repository tags pointing at the image.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Something that can build and run container images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Builds an image, streaming output to the terminal.
    async fn build(&self, request: &BuildRequest) -> Result<ProcessExit, RuntimeError>;

    /// Runs a container to completion, streaming output to the terminal.
    async fn run(&self, request: &RunRequest) -> Result<ProcessExit, RuntimeError>;

    /// Runs a container to completion and returns its standard output.
    async fn capture(&self, request: &RunRequest) -> Result<String, RuntimeError>;

    /// Returns metadata for a local image.
    async fn inspect_image(&self, image: &str) -> Result<ImageInfo, RuntimeError>;

    /// Kills the running container called `name`.
    async fn kill(&self, name: &str) -> Result<(), RuntimeError>;
}
