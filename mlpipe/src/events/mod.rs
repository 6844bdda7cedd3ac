//! Event sink system for observability.
//!
//! The runner reports every lifecycle transition as a [`crate::core::StageEvent`]
//! to an [`EventSink`]. The CLI uses [`LoggingEventSink`]; tests use
//! [`CollectingEventSink`] to assert on ordering.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
