//! Stage specifications.

use crate::core::StageKind;
use crate::errors::PipelineValidationError;
use crate::stages::Stage;
use std::sync::Arc;

/// Specification for a single stage in a pipeline.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// The kind of stage.
    pub kind: StageKind,
    /// What the stage does, usually its command line.
    pub description: String,
    /// The stage implementation.
    pub runner: Arc<dyn Stage>,
}

impl StageSpec {
    /// Creates a specification named after its runner.
    #[must_use]
    pub fn new(runner: Arc<dyn Stage>) -> Self {
        Self {
            name: runner.name().to_string(),
            kind: runner.kind(),
            description: runner.describe(),
            runner,
        }
    }

    /// Overrides the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validates the stage specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or whitespace-only.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                "Stage name cannot be empty or whitespace-only",
            )
            .with_code("PIPELINE-STAGE-NAME")
            .with_fix_hint("Give every stage a non-blank name."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedStage;

    #[test]
    fn test_stage_spec_from_runner() {
        let spec = StageSpec::new(Arc::new(ScriptedStage::new("train")));

        assert_eq!(spec.name, "train");
        assert_eq!(spec.kind, StageKind::Container);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_stage_spec_blank_name() {
        let spec = StageSpec::new(Arc::new(ScriptedStage::new("x"))).with_name("  ");
        let err = spec.validate().unwrap_err();
        assert_eq!(err.code.as_deref(), Some("PIPELINE-STAGE-NAME"));
    }
}
