//! Test fixtures for pipeline testing.

use std::path::Path;
use std::sync::Arc;

use super::ScriptedRuntime;
use crate::config::PipelineConfig;
use crate::container::ContainerRuntime;
use crate::context::{PipelineContext, StageContext};
use crate::events::{CollectingEventSink, EventSink};

/// Wires a configuration, a [`ScriptedRuntime`] and a
/// [`CollectingEventSink`] into contexts for stage and runner tests.
#[derive(Debug)]
pub struct TestHarness {
    config: PipelineConfig,
    runtime: Arc<ScriptedRuntime>,
    events: Arc<CollectingEventSink>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Creates a harness with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            runtime: Arc::new(ScriptedRuntime::new()),
            events: Arc::new(CollectingEventSink::new()),
        }
    }

    /// Points the configuration at `workdir`.
    #[must_use]
    pub fn with_workdir(mut self, workdir: &Path) -> Self {
        self.config = self.config.with_workdir(workdir);
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The scripted runtime shared by every context this harness creates.
    #[must_use]
    pub fn runtime(&self) -> &ScriptedRuntime {
        &self.runtime
    }

    /// Events emitted through contexts this harness created.
    #[must_use]
    pub fn events(&self) -> &CollectingEventSink {
        &self.events
    }

    /// A fresh pipeline context (new run id) over the shared runtime and sink.
    #[must_use]
    pub fn pipeline_context(&self) -> Arc<PipelineContext> {
        let runtime: Arc<dyn ContainerRuntime> = self.runtime.clone();
        let events: Arc<dyn EventSink> = self.events.clone();
        Arc::new(PipelineContext::new(self.config.clone(), runtime).with_event_sink(events))
    }

    /// A stage context for `stage_name` at `position`.
    #[must_use]
    pub fn stage_context(&self, stage_name: &str, position: usize) -> StageContext {
        StageContext::new(self.pipeline_context(), stage_name, position)
    }
}
