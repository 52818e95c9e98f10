//! Lifecycle events for observability.
//!
//! The controller reports progress through an injected [`EventSink`]. Event
//! names are dotted, `<scope>.<what>`, and payloads are JSON objects that
//! always carry `execution_id`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

#[cfg(test)]
pub use sink::MockEventSink;

/// Emitted before phase 1 starts.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Emitted after the artifact is built.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// Emitted when a configuration error stops the run.
pub const PIPELINE_FAILED: &str = "pipeline.failed";
/// Emitted when a phase begins.
pub const PHASE_STARTED: &str = "phase.started";
/// Emitted when a phase's result set is frozen.
pub const PHASE_COMPLETED: &str = "phase.completed";
/// Emitted for each completed unit.
pub const UNIT_COMPLETED: &str = "unit.completed";
/// Emitted for each failed unit.
pub const UNIT_FAILED: &str = "unit.failed";
/// Emitted for each cancelled unit.
pub const UNIT_CANCELLED: &str = "unit.cancelled";
