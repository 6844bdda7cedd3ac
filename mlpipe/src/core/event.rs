//! Pipeline event type for lifecycle notifications.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event emitted while a pipeline runs.
///
/// Events are consumed by [`crate::events::EventSink`] implementations for
/// logging or test assertions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    /// The event type (e.g., "stage.started", "stage.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl StageEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns the payload as a JSON object.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        serde_json::Value::Object(self.data.clone().into_iter().collect())
    }

    /// Creates a "pipeline.started" event.
    #[must_use]
    pub fn pipeline_started(pipeline: &str, run_id: &str, stage_count: usize) -> Self {
        Self::new("pipeline.started")
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("stage_count", serde_json::json!(stage_count))
    }

    /// Creates a "pipeline.completed" event.
    #[must_use]
    pub fn pipeline_completed(pipeline: &str, duration_ms: f64) -> Self {
        Self::new("pipeline.completed")
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "pipeline.failed" event.
    #[must_use]
    pub fn pipeline_failed(pipeline: &str, stage: &str, exit_code: i32) -> Self {
        Self::new("pipeline.failed")
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("stage", serde_json::json!(stage))
            .add_data("exit_code", serde_json::json!(exit_code))
    }

    /// Creates a "stage.started" event.
    #[must_use]
    pub fn started(stage_name: &str, position: usize) -> Self {
        Self::new("stage.started")
            .add_data("stage", serde_json::json!(stage_name))
            .add_data("position", serde_json::json!(position))
    }

    /// Creates a "stage.completed" event.
    #[must_use]
    pub fn completed(stage_name: &str, duration_ms: f64) -> Self {
        Self::new("stage.completed")
            .add_data("stage", serde_json::json!(stage_name))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "stage.failed" event.
    #[must_use]
    pub fn failed(stage_name: &str, error: &str) -> Self {
        Self::new("stage.failed")
            .add_data("stage", serde_json::json!(stage_name))
            .add_data("error", serde_json::json!(error))
    }

    /// Creates a "stage.skipped" event.
    #[must_use]
    pub fn skipped(stage_name: &str, reason: &str) -> Self {
        Self::new("stage.skipped")
            .add_data("stage", serde_json::json!(stage_name))
            .add_data("reason", serde_json::json!(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = StageEvent::new("test.event");
        assert_eq!(event.event_type, "test.event");
        assert!(event.data.is_empty());
    }

    #[test]
    fn test_event_started() {
        let event = StageEvent::started("train", 2);
        assert_eq!(event.event_type, "stage.started");
        assert_eq!(event.data.get("stage"), Some(&serde_json::json!("train")));
        assert_eq!(event.data.get("position"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_event_completed() {
        let event = StageEvent::completed("train", 123.45);
        assert_eq!(event.data.get("duration_ms"), Some(&serde_json::json!(123.45)));
    }

    #[test]
    fn test_pipeline_failed_payload() {
        let event = StageEvent::pipeline_failed("local", "predict", 2);
        let payload = event.payload();
        assert_eq!(payload["stage"], serde_json::json!("predict"));
        assert_eq!(payload["exit_code"], serde_json::json!(2));
    }
}
