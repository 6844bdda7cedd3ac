//! Final cleanup gate.

use super::Stage;
use crate::cleanup::{remove_dirs, Confirm, CLEANUP_QUESTION};
use crate::context::StageContext;
use crate::core::{StageKind, StageOutput};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Asks whether to remove the working directories and removes them on `y`.
///
/// Always succeeds: declining, or failing to remove a directory, leaves the
/// run successful.
#[derive(Debug, Clone)]
pub struct CleanupStage {
    name: String,
    confirm: Arc<dyn Confirm>,
}

impl CleanupStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(name: impl Into<String>, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            name: name.into(),
            confirm,
        }
    }
}

#[async_trait]
impl Stage for CleanupStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Cleanup
    }

    fn describe(&self) -> String {
        CLEANUP_QUESTION.trim().to_string()
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        let dirs = ctx.config().working_dirs();
        let confirm = Arc::clone(&self.confirm);
        let outcome = tokio::task::spawn_blocking(move || {
            confirm.confirm(CLEANUP_QUESTION).then(|| remove_dirs(&dirs))
        })
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Cleanup task failed");
            None
        });

        let Some(outcome) = outcome else {
            info!("Keeping working directories");
            return StageOutput::ok().add_metadata("removed", json!(false));
        };

        let removed: Vec<String> = outcome.removed.iter().map(|d| d.display().to_string()).collect();
        StageOutput::ok()
            .add_metadata("removed", json!(true))
            .add_metadata("directories", json!(removed))
            .add_metadata("failures", json!(outcome.failed.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::FixedAnswer;
    use crate::testing::TestHarness;

    fn make_dirs(root: &std::path::Path) {
        for name in ["test_data", "test_models", "test_predictions"] {
            std::fs::create_dir_all(root.join(name)).unwrap();
        }
    }

    #[tokio::test]
    async fn test_declined_keeps_dirs() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path());
        let harness = TestHarness::new().with_workdir(dir.path());

        let output = CleanupStage::new("cleanup", Arc::new(FixedAnswer(false)))
            .execute(&harness.stage_context("cleanup", 10))
            .await;

        assert!(output.is_success());
        assert!(dir.path().join("test_models").is_dir());
    }

    #[tokio::test]
    async fn test_accepted_removes_dirs() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path());
        let harness = TestHarness::new().with_workdir(dir.path());

        let output = CleanupStage::new("cleanup", Arc::new(FixedAnswer(true)))
            .execute(&harness.stage_context("cleanup", 10))
            .await;

        assert!(output.is_success());
        assert_eq!(output.get("removed"), Some(&json!(true)));
        assert!(!dir.path().join("test_data").exists());
        assert!(!dir.path().join("test_models").exists());
        assert!(!dir.path().join("test_predictions").exists());
    }

    #[tokio::test]
    async fn test_removal_failure_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path());
        std::fs::remove_dir(dir.path().join("test_predictions")).unwrap();
        std::fs::write(dir.path().join("test_predictions"), "not a directory").unwrap();
        let harness = TestHarness::new().with_workdir(dir.path());

        let output = CleanupStage::new("cleanup", Arc::new(FixedAnswer(true)))
            .execute(&harness.stage_context("cleanup", 10))
            .await;

        assert!(output.is_success());
        assert_eq!(output.get("failures"), Some(&json!(1)));
        assert!(!dir.path().join("test_models").exists());
    }
}
