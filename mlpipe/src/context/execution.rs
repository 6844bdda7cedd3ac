//! Pipeline and stage execution contexts.

use super::RunIdentity;
use crate::config::PipelineConfig;
use crate::container::ContainerRuntime;
use crate::core::StageEvent;
use crate::events::{EventSink, NoOpEventSink};
use std::sync::Arc;

/// Shared state for one pipeline run.
///
/// Stages reach the container runtime, configuration and event sink
/// through this context rather than owning them.
pub struct PipelineContext {
    identity: RunIdentity,
    config: Arc<PipelineConfig>,
    runtime: Arc<dyn ContainerRuntime>,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("identity", &self.identity)
            .field("image", &self.config.image)
            .field("workdir", &self.config.workdir)
            .finish_non_exhaustive()
    }
}

impl PipelineContext {
    /// Creates a context with a fresh run identity and no event sink.
    #[must_use]
    pub fn new(config: PipelineConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            identity: RunIdentity::new(),
            config: Arc::new(config),
            runtime,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the run identity.
    #[must_use]
    pub fn with_identity(mut self, identity: RunIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the container runtime.
    #[must_use]
    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    /// Emits an event to the configured sink.
    pub async fn emit(&self, event: StageEvent) {
        self.event_sink.emit(&event).await;
    }
}

/// The view of a run that a single stage receives.
#[derive(Debug, Clone)]
pub struct StageContext {
    pipeline: Arc<PipelineContext>,
    stage_name: String,
    position: usize,
}

impl StageContext {
    /// Creates a stage context.
    #[must_use]
    pub fn new(pipeline: Arc<PipelineContext>, stage_name: impl Into<String>, position: usize) -> Self {
        Self {
            pipeline,
            stage_name: stage_name.into(),
            position,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Returns the zero-based position of the stage in the pipeline.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the pipeline context.
    #[must_use]
    pub fn pipeline(&self) -> &PipelineContext {
        &self.pipeline
    }

    /// Shorthand for the run configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    /// Shorthand for the container runtime.
    #[must_use]
    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.pipeline.runtime()
    }

    /// Shorthand for the run ID string.
    #[must_use]
    pub fn run_id(&self) -> String {
        self.pipeline.identity().run_id_string()
    }
}
