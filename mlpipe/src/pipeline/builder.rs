//! Pipeline builder with validation.

use super::StageSpec;
use crate::errors::PipelineValidationError;
use crate::stages::Stage;
use std::collections::HashSet;
use std::sync::Arc;

/// An ordered, validated list of stages.
///
/// Stage identity is position; names are unique and only used for reporting.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    stages: Vec<StageSpec>,
}

impl Pipeline {
    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false for a built pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Returns a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageSpec> {
        self.stages.iter().find(|s| s.name == name)
    }
}

/// Builder for creating validated pipelines.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    name: String,
    stages: Vec<StageSpec>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, runner: Arc<dyn Stage>) -> Self {
        self.stages.push(StageSpec::new(runner));
        self
    }

    /// Appends a stage when `condition` holds.
    #[must_use]
    pub fn stage_if(self, condition: bool, runner: impl FnOnce() -> Arc<dyn Stage>) -> Self {
        if condition {
            self.stage(runner())
        } else {
            self
        }
    }

    /// Appends a stage specification.
    pub fn add_stage_spec(&mut self, spec: StageSpec) {
        self.stages.push(spec);
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline name is blank, there are no stages,
    /// a stage name is blank, or two stages share a name.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                "Pipeline name cannot be empty or whitespace-only",
            )
            .with_code("PIPELINE-NAME"));
        }

        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no stages")
                .with_code("PIPELINE-EMPTY")
                .with_fix_hint("Add at least one stage to the pipeline before building."));
        }

        let mut seen = HashSet::new();
        for spec in &self.stages {
            spec.validate()?;
            if !seen.insert(spec.name.as_str()) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' appears more than once",
                    spec.name
                ))
                .with_stages(vec![spec.name.clone()])
                .with_code("PIPELINE-DUPLICATE")
                .with_fix_hint("Stage names must be unique; rename one of the stages."));
            }
        }

        Ok(Pipeline {
            name: self.name,
            stages: self.stages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedStage;

    fn stage(name: &str) -> Arc<dyn Stage> {
        Arc::new(ScriptedStage::new(name))
    }

    #[test]
    fn test_build_keeps_order() {
        let pipeline = PipelineBuilder::new("ml")
            .stage(stage("train"))
            .stage(stage("verify-model"))
            .stage(stage("predict"))
            .build()
            .unwrap();

        assert_eq!(pipeline.name(), "ml");
        assert_eq!(pipeline.stage_names(), vec!["train", "verify-model", "predict"]);
        assert!(pipeline.stage("predict").is_some());
        assert!(pipeline.stage("missing").is_none());
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        let err = PipelineBuilder::new("ml").build().unwrap_err();
        assert_eq!(err.code.as_deref(), Some("PIPELINE-EMPTY"));
        assert!(err.fix_hint.is_some());
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let err = PipelineBuilder::new("ml")
            .stage(stage("train"))
            .stage(stage("train"))
            .build()
            .unwrap_err();

        assert_eq!(err.code.as_deref(), Some("PIPELINE-DUPLICATE"));
        assert_eq!(err.stages, vec!["train"]);
    }

    #[test]
    fn test_blank_names_rejected() {
        assert!(PipelineBuilder::new(" ").stage(stage("train")).build().is_err());
        assert!(PipelineBuilder::new("ml").stage(stage("")).build().is_err());
    }

    #[test]
    fn test_stage_if() {
        let builder = PipelineBuilder::new("ml")
            .stage(stage("train"))
            .stage_if(false, || stage("prune"))
            .stage_if(true, || stage("report"));

        assert_eq!(builder.stage_count(), 2);
        assert_eq!(builder.build().unwrap().stage_names(), vec!["train", "report"]);
    }
}
