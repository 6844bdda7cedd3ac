//! Diagnostic report printed after the validation stages.

use super::{ArtifactVerifier, ExpectedArtifact, Stage};
use crate::container::{ImageInfo, RunRequest};
use crate::context::StageContext;
use crate::core::{StageKind, StageOutput};
use crate::utils::sha256_file;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Prefix of the metrics files the training script writes next to the model.
const METRICS_PREFIX: &str = "metrics_";

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntryInfo {
    /// File name.
    pub name: String,
    /// Size in bytes of the entry itself (not the link target).
    pub size_bytes: u64,
    /// Whether the entry is a directory.
    #[serde(default)]
    pub is_dir: bool,
    /// Target of a symlink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
}

/// Listing of one working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirListing {
    /// Directory path.
    pub path: PathBuf,
    /// Whether the directory exists.
    pub exists: bool,
    /// Entries sorted by name.
    #[serde(default)]
    pub entries: Vec<DirEntryInfo>,
}

impl DirListing {
    /// Lists `path`. A missing or unreadable directory gives an empty listing.
    #[must_use]
    pub fn read(path: &Path) -> Self {
        let Ok(read_dir) = std::fs::read_dir(path) else {
            return Self {
                path: path.to_path_buf(),
                exists: false,
                entries: Vec::new(),
            };
        };

        let mut entries: Vec<DirEntryInfo> = read_dir
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let meta = std::fs::symlink_metadata(entry.path()).ok()?;
                let link_target = if meta.file_type().is_symlink() {
                    std::fs::read_link(entry.path())
                        .ok()
                        .map(|t| t.display().to_string())
                } else {
                    None
                };
                Some(DirEntryInfo {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    size_bytes: meta.len(),
                    is_dir: meta.is_dir(),
                    link_target,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            path: path.to_path_buf(),
            exists: true,
            entries,
        }
    }
}

/// Everything the report stage gathered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Image metadata, if the image could be inspected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageInfo>,
    /// Working directory listings.
    #[serde(default)]
    pub directories: Vec<DirListing>,
    /// `KEY=VALUE` lines seen inside the container, sorted.
    #[serde(default)]
    pub container_env: Vec<String>,
    /// SHA-256 of each present artifact, keyed by artifact name.
    #[serde(default)]
    pub artifact_digests: BTreeMap<String, String>,
    /// Accuracy from the newest metrics file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Data rows in the predictions file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_rows: Option<usize>,
    /// Things that could not be gathered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl DiagnosticReport {
    fn note(&mut self, note: String) {
        warn!(note = %note, "Report incomplete");
        self.notes.push(note);
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Image ==")?;
        match &self.image {
            Some(image) => {
                writeln!(f, "  id:      {}", image.id)?;
                writeln!(f, "  tags:    {}", image.tags.join(", "))?;
                writeln!(f, "  created: {}", image.created)?;
                writeln!(f, "  size:    {} bytes", image.size_bytes)?;
                writeln!(f, "  os/arch: {}/{}", image.os, image.architecture)?;
            }
            None => writeln!(f, "  (unavailable)")?,
        }

        for listing in &self.directories {
            writeln!(f, "== {} ==", listing.path.display())?;
            if !listing.exists {
                writeln!(f, "  (missing)")?;
                continue;
            }
            if listing.entries.is_empty() {
                writeln!(f, "  (empty)")?;
            }
            for entry in &listing.entries {
                match &entry.link_target {
                    Some(target) => writeln!(f, "  {} -> {}", entry.name, target)?,
                    None if entry.is_dir => writeln!(f, "  {}/", entry.name)?,
                    None => writeln!(f, "  {:<40} {:>10}", entry.name, entry.size_bytes)?,
                }
            }
        }

        writeln!(f, "== Container environment ==")?;
        for line in &self.container_env {
            writeln!(f, "  {line}")?;
        }

        writeln!(f, "== Results ==")?;
        for (name, digest) in &self.artifact_digests {
            writeln!(f, "  {name} sha256: {digest}")?;
        }
        if let Some(accuracy) = self.accuracy {
            writeln!(f, "  accuracy: {accuracy:.4}")?;
        }
        if let Some(rows) = self.prediction_rows {
            writeln!(f, "  predictions: {rows} rows")?;
        }
        for note in &self.notes {
            writeln!(f, "  note: {note}")?;
        }
        Ok(())
    }
}

/// Prints image metadata, directory listings, container environment and
/// result summaries.
///
/// Purely diagnostic: anything that cannot be gathered becomes a note and
/// the stage still succeeds.
#[derive(Debug, Clone)]
pub struct ReportStage {
    name: String,
    image: String,
    model: ExpectedArtifact,
    predictions: ExpectedArtifact,
    print: bool,
}

impl ReportStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        model: ExpectedArtifact,
        predictions: ExpectedArtifact,
    ) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            model,
            predictions,
            print: true,
        }
    }

    /// Gathers the report without printing it.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.print = false;
        self
    }

    /// Collects the report.
    pub async fn gather(&self, ctx: &StageContext) -> DiagnosticReport {
        let mut report = DiagnosticReport::default();
        let runtime = ctx.runtime();

        match runtime.inspect_image(&self.image).await {
            Ok(info) => report.image = Some(info),
            Err(e) => report.note(format!("image inspect failed: {e}")),
        }

        report.directories = ctx
            .config()
            .working_dirs()
            .iter()
            .map(|d| DirListing::read(d))
            .collect();

        let env_request = RunRequest::new(&self.image).with_command(["env"]);
        match runtime.capture(&env_request).await {
            Ok(stdout) => {
                let mut lines: Vec<String> = stdout
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(str::to_string)
                    .collect();
                lines.sort();
                report.container_env = lines;
            }
            Err(e) => report.note(format!("container env unavailable: {e}")),
        }

        for artifact in ArtifactVerifier.check_all(&[self.model.clone(), self.predictions.clone()]) {
            if !artifact.present {
                continue;
            }
            match sha256_file(&artifact.path) {
                Ok(digest) => {
                    report.artifact_digests.insert(artifact.name.clone(), digest);
                }
                Err(e) => report.note(format!("cannot hash {}: {e}", artifact.path.display())),
            }
        }

        if let Some(models_dir) = self.model.path.parent() {
            match latest_accuracy(models_dir) {
                Ok(accuracy) => report.accuracy = accuracy,
                Err(e) => report.note(format!("cannot read metrics: {e}")),
            }
        }

        match count_rows(&self.predictions.path) {
            Ok(rows) => report.prediction_rows = rows,
            Err(e) => report.note(format!("cannot read predictions: {e}")),
        }

        report
    }
}

#[async_trait]
impl Stage for ReportStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Report
    }

    fn describe(&self) -> String {
        format!("inspect {}, list working dirs, summarize results", self.image)
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        let report = self.gather(ctx).await;

        if self.print {
            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "{report}");
            let _ = stdout.flush();
        }

        let output = StageOutput::ok();
        match serde_json::to_value(&report) {
            Ok(value) => output.add_metadata("report", value),
            Err(e) => {
                warn!(error = %e, "Failed to serialize report");
                output
            }
        }
    }
}

/// Reads `accuracy` from the newest `metrics_*.json` in `dir`.
///
/// Metrics files carry a sortable timestamp in their name, so the
/// lexicographically last one is the newest.
fn latest_accuracy(dir: &Path) -> std::io::Result<Option<f64>> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Ok(None);
    };
    let newest = read_dir
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(METRICS_PREFIX) && n.ends_with(".json"))
        .max();
    let Some(newest) = newest else {
        return Ok(None);
    };

    let raw = std::fs::read_to_string(dir.join(&newest))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(value.get("accuracy").and_then(serde_json::Value::as_f64))
}

/// Counts data rows (lines minus the header) in a CSV file.
fn count_rows(path: &Path) -> std::io::Result<Option<usize>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw.lines().count().saturating_sub(1))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
