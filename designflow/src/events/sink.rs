//! Event sink trait and implementations.

use serde_json::Value;
use tracing::{debug, info, warn, Level};

/// Trait for event sinks that can receive events.
///
/// Emission must never fail or block for long; sinks log or buffer and
/// return.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Emits an event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "unit.failed")
    /// * `data` - Optional event data
    fn emit(&self, event_type: &str, data: Option<Value>);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// An event sink that logs events using the tracing framework.
///
/// `*.failed` events are always logged at warn level with their error.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event_type: &str, data: Option<Value>) {
        let field = |key: &str| {
            data.as_ref()
                .and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string()
        };
        let execution_id = field("execution_id");
        let unit = field("unit");

        if event_type.ends_with(".failed") {
            warn!(
                event_type = %event_type,
                execution_id = %execution_id,
                unit = %unit,
                error = %field("error"),
                "event"
            );
            return;
        }

        let payload = data.map(|d| d.to_string()).unwrap_or_default();
        if self.level == Level::DEBUG {
            debug!(event_type = %event_type, execution_id = %execution_id, unit = %unit, event_data = %payload, "event");
        } else {
            info!(event_type = %event_type, execution_id = %execution_id, unit = %unit, "event");
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<(String, Option<Value>)>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<Value>)> {
        self.events.read().clone()
    }

    /// Returns the collected event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<(String, Option<Value>)> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event_type: &str, data: Option<Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}
