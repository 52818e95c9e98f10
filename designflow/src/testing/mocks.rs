//! Mock units for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::context::UnitInput;
use crate::core::{DataMap, UnitPayload, UnitResult, UnitStatus};
use crate::units::Unit;

/// A mock unit that records calls and returns a configurable outcome.
#[derive(Debug)]
pub struct MockUnit {
    name: String,
    outcome: Mutex<Result<Option<UnitPayload>, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockUnit {
    /// Creates a new mock unit that completes without a payload.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: Mutex::new(Ok(None)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes later calls complete with the payload.
    pub fn set_payload(&self, payload: UnitPayload) {
        *self.outcome.lock() = Ok(Some(payload));
    }

    /// Makes later calls fail with the error.
    pub fn set_error(&self, error: impl Into<String>) {
        *self.outcome.lock() = Err(error.into());
    }

    /// Returns the number of times the unit was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the execution id seen by each call.
    #[must_use]
    pub fn recorded_execution_ids(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl Unit for MockUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: &UnitInput) -> UnitResult {
        self.calls.lock().push(input.execution_id().to_string());
        match self.outcome.lock().clone() {
            Ok(Some(payload)) => input.complete(payload),
            Ok(None) => UnitResult::completed_empty(input.unit_name(), input.execution_id()),
            Err(error) => input.fail(error),
        }
    }
}

/// A unit that always completes with a custom payload.
#[derive(Debug)]
pub struct SuccessUnit {
    name: String,
    data: DataMap,
}

impl SuccessUnit {
    /// Creates a unit completing with an empty custom payload.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: DataMap::new(),
        }
    }

    /// Creates a unit completing with the given data.
    #[must_use]
    pub fn with_data(name: impl Into<String>, data: DataMap) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

#[async_trait]
impl Unit for SuccessUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: &UnitInput) -> UnitResult {
        input.complete(UnitPayload::Custom(self.data.clone()))
    }
}

/// A unit that always fails.
#[derive(Debug)]
pub struct FailingUnit {
    name: String,
    error: String,
    retryable: bool,
    calls: AtomicUsize,
}

impl FailingUnit {
    /// Creates a new failing unit.
    #[must_use]
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
            retryable: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a failing unit whose failures the executor may retry.
    #[must_use]
    pub fn retryable(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            retryable: true,
            ..Self::new(name, error)
        }
    }

    /// Returns the number of times the unit was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Unit for FailingUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: &UnitInput) -> UnitResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.retryable {
            UnitResult::failed_retryable(input.unit_name(), input.execution_id(), &self.error)
        } else {
            input.fail(&self.error)
        }
    }
}

/// A unit that panics inside `execute`.
#[derive(Debug)]
pub struct PanickingUnit {
    name: String,
}

impl PanickingUnit {
    /// Creates a new panicking unit.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Unit for PanickingUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _input: &UnitInput) -> UnitResult {
        panic!("unit '{}' panicked", self.name)
    }
}

/// A unit that sleeps before completing.
#[derive(Debug)]
pub struct SlowUnit {
    name: String,
    delay: Duration,
}

impl SlowUnit {
    /// Creates a new slow unit.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }

    /// Creates a slow unit with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(name: impl Into<String>, ms: u64) -> Self {
        Self::new(name, Duration::from_millis(ms))
    }
}

#[async_trait]
impl Unit for SlowUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: &UnitInput) -> UnitResult {
        tokio::time::sleep(self.delay).await;
        UnitResult::completed_empty(input.unit_name(), input.execution_id())
    }
}

/// What a [`RecordingUnit`] saw on one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedExecution {
    /// Unit name from the input.
    pub unit_name: String,
    /// Execution id from the input.
    pub execution_id: String,
    /// Analysis results visible to the call, by name and status.
    pub analysis: Vec<(String, UnitStatus)>,
    /// Synthesis results visible to the call, by name and status.
    pub synthesis: Vec<(String, UnitStatus)>,
}

/// A unit that records the upstream results it receives.
#[derive(Debug)]
pub struct RecordingUnit {
    name: String,
    executions: Mutex<Vec<RecordedExecution>>,
}

impl RecordingUnit {
    /// Creates a new recording unit.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executions: Mutex::new(Vec::new()),
        }
    }

    /// Returns all recorded executions.
    #[must_use]
    pub fn executions(&self) -> Vec<RecordedExecution> {
        self.executions.lock().clone()
    }

    /// Returns the number of executions.
    #[must_use]
    pub fn execution_count(&self) -> usize {
        self.executions.lock().len()
    }

    /// Clears recorded executions.
    pub fn clear(&self) {
        self.executions.lock().clear();
    }
}

fn statuses(set: Option<&crate::core::PhaseResultSet>) -> Vec<(String, UnitStatus)> {
    set.into_iter()
        .flat_map(|s| s.iter())
        .map(|r| (r.unit_name.clone(), r.status))
        .collect()
}

#[async_trait]
impl Unit for RecordingUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: &UnitInput) -> UnitResult {
        self.executions.lock().push(RecordedExecution {
            unit_name: input.unit_name().to_string(),
            execution_id: input.execution_id().to_string(),
            analysis: statuses(input.analysis()),
            synthesis: statuses(input.synthesis()),
        });
        UnitResult::completed_empty(input.unit_name(), input.execution_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{PipelineRequest, RunIdentity};
    use crate::core::{Phase, PhaseResultSet};
    use serde_json::json;
    use std::sync::Arc;

    fn input(name: &str) -> UnitInput {
        UnitInput::new(
            RunIdentity::with_execution_id("exec_test"),
            Arc::new(PipelineRequest::new(".")),
        )
        .for_unit(name)
    }

    #[tokio::test]
    async fn test_mock_unit() {
        let unit = MockUnit::new("test");

        let result = unit.execute(&input("test")).await;
        assert!(result.is_success());
        assert_eq!(unit.call_count(), 1);

        unit.set_error("error");
        let result = unit.execute(&input("test")).await;
        assert!(result.is_failure());
        assert_eq!(unit.call_count(), 2);
        assert_eq!(unit.recorded_execution_ids(), vec!["exec_test", "exec_test"]);
    }

    #[tokio::test]
    async fn test_success_unit_with_data() {
        let mut data = DataMap::new();
        data.insert("key".to_string(), json!("value"));
        let unit = SuccessUnit::with_data("success", data.clone());

        let result = unit.execute(&input("success")).await;
        assert_eq!(result.payload, Some(UnitPayload::Custom(data)));
    }

    #[tokio::test]
    async fn test_failing_unit_retryable() {
        let unit = FailingUnit::retryable("fail", "retry me");

        let result = unit.execute(&input("fail")).await;
        assert!(result.is_failure());
        assert!(result.retryable);
        assert_eq!(unit.call_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_unit() {
        let unit = SlowUnit::with_delay_ms("slow", 10);

        let start = std::time::Instant::now();
        let result = unit.execute(&input("slow")).await;

        assert!(result.is_success());
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_recording_unit() {
        let mut analysis = PhaseResultSet::new(Phase::Analysis);
        analysis.insert(UnitResult::failed("a", "exec_test", "boom"));
        let unit = RecordingUnit::new("record");
        let input = input("record").with_analysis(Arc::new(analysis));

        unit.execute(&input).await;

        let executions = unit.executions();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].analysis, vec![("a".to_string(), UnitStatus::Failed)]);
        assert!(executions[0].synthesis.is_empty());
    }
}
