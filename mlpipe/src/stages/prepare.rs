//! Working-directory preparation.

use super::Stage;
use crate::context::StageContext;
use crate::core::{StageKind, StageOutput};
use crate::errors::FailureKind;
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

/// Creates the host directories that are bind-mounted into every container.
///
/// Existing directories and their contents are left alone, so a second run
/// overwrites artifacts in place.
#[derive(Debug, Clone)]
pub struct PrepareStage {
    name: String,
}

impl PrepareStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Stage for PrepareStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Prepare
    }

    fn describe(&self) -> String {
        "create the data, models and predictions directories".to_string()
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        let config = ctx.config();
        let dirs = config.working_dirs();

        for dir in &dirs {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                return StageOutput::fail(
                    FailureKind::StageExecution,
                    None,
                    format!("Failed to create {}: {e}", dir.display()),
                );
            }
        }

        let data_dir = config.host_dir(&config.layout.data);
        let data_files = count_entries(&data_dir).await;
        if data_files == 0 {
            warn!(
                dir = %data_dir.display(),
                "No training data found; the train stage must generate its own"
            );
        } else {
            info!(dir = %data_dir.display(), files = data_files, "Training data present");
        }

        let created: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
        StageOutput::ok()
            .add_metadata("directories", json!(created))
            .add_metadata("data_files", json!(data_files))
    }
}

async fn count_entries(dir: &std::path::Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(_)) = entries.next_entry().await {
        count += 1;
    }
    count
}
