//! Stage artifact type for files a stage is contracted to produce.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A file on the host filesystem observed after a stage ran.
///
/// Artifacts are recorded by verify stages whether or not the file was found,
/// so a run summary shows exactly what was checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageArtifact {
    /// Short name of the artifact (e.g. "model", "predictions").
    pub name: String,

    /// Host path that was checked.
    pub path: PathBuf,

    /// Whether a regular file (following symlinks) was found at `path`.
    pub present: bool,

    /// Size in bytes of the resolved file, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// Additional metadata about the artifact.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    /// When the artifact was checked (ISO 8601).
    pub checked_at: String,
}

impl StageArtifact {
    /// Records an artifact that was found on disk.
    #[must_use]
    pub fn present(name: impl Into<String>, path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            present: true,
            size_bytes: Some(size_bytes),
            metadata: HashMap::new(),
            checked_at: crate::utils::iso_timestamp(),
        }
    }

    /// Records an artifact that was expected but not found.
    #[must_use]
    pub fn missing(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            present: false,
            size_bytes: None,
            metadata: HashMap::new(),
            checked_at: crate::utils::iso_timestamp(),
        }
    }

    /// Adds metadata to the artifact.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns the checked path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
