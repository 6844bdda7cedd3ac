//! Artifact existence checks.

use super::Stage;
use crate::context::StageContext;
use crate::core::{StageArtifact, StageKind, StageOutput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// A file a producing stage is contracted to leave on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedArtifact {
    /// Short name, e.g. `model`.
    pub name: String,
    /// Host path.
    pub path: PathBuf,
}

impl ExpectedArtifact {
    /// Creates an expected artifact.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Checks that artifacts exist. Nothing about their content is validated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactVerifier;

impl ArtifactVerifier {
    /// Checks one artifact.
    ///
    /// Symlinks are followed: a dangling link, or a path that resolves to a
    /// directory, counts as absent.
    #[must_use]
    pub fn check(&self, expected: &ExpectedArtifact) -> StageArtifact {
        match std::fs::metadata(&expected.path) {
            Ok(meta) if meta.is_file() => {
                let artifact = StageArtifact::present(&expected.name, &expected.path, meta.len());
                match link_target(&expected.path) {
                    Some(target) => artifact.with_metadata("link_target", serde_json::json!(target)),
                    None => artifact,
                }
            }
            _ => StageArtifact::missing(&expected.name, &expected.path),
        }
    }

    /// Checks several artifacts, in order.
    #[must_use]
    pub fn check_all(&self, expected: &[ExpectedArtifact]) -> Vec<StageArtifact> {
        expected.iter().map(|e| self.check(e)).collect()
    }
}

fn link_target(path: &Path) -> Option<String> {
    let meta = std::fs::symlink_metadata(path).ok()?;
    if !meta.file_type().is_symlink() {
        return None;
    }
    std::fs::read_link(path).ok().map(|t| t.display().to_string())
}

/// Fails the run when the preceding stage did not leave its artifact.
#[derive(Debug, Clone)]
pub struct VerifyArtifactStage {
    name: String,
    expected: ExpectedArtifact,
}

impl VerifyArtifactStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(name: impl Into<String>, expected: ExpectedArtifact) -> Self {
        Self {
            name: name.into(),
            expected,
        }
    }

    /// The artifact this stage checks for.
    #[must_use]
    pub fn expected(&self) -> &ExpectedArtifact {
        &self.expected
    }
}

#[async_trait]
impl Stage for VerifyArtifactStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Verify
    }

    fn describe(&self) -> String {
        format!("test -f {}", self.expected.path.display())
    }

    async fn execute(&self, _ctx: &StageContext) -> StageOutput {
        let artifact = ArtifactVerifier.check(&self.expected);
        if artifact.present {
            info!(artifact = %artifact.name, path = %artifact.path.display(), "Artifact present");
            StageOutput::ok().with_artifacts(vec![artifact])
        } else {
            error!(artifact = %artifact.name, path = %artifact.path.display(), "Artifact missing");
            StageOutput::missing_artifact(artifact)
        }
    }
}
