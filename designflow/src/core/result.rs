//! The result envelope every unit returns.

use super::{DataMap, UnitPayload, UnitStatus};
use crate::errors::UnitFault;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata key holding the fault tag of a failed or cancelled result.
pub const FAULT_METADATA_KEY: &str = "fault";

/// Metadata key holding the number of attempts made.
pub const ATTEMPTS_METADATA_KEY: &str = "attempts";

/// The outcome of one unit invocation.
///
/// A `completed` result never carries an error; a `failed` or `cancelled`
/// result always does. Results are built once through the factory methods
/// and the consuming `with_*` adapters, then handed to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitResult {
    /// Name of the unit that produced this result.
    pub unit_name: String,

    /// Execution identifier of the run.
    pub execution_id: String,

    /// Final status.
    pub status: UnitStatus,

    /// When the result was produced.
    pub timestamp: DateTime<Utc>,

    /// Wall-clock time spent, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,

    /// Error message (for failed or cancelled results).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Unit-specific payload (for completed results).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<UnitPayload>,

    /// Additional metadata.
    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub metadata: DataMap,

    /// Whether another attempt may succeed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl UnitResult {
    fn base(unit_name: impl Into<String>, execution_id: impl Into<String>, status: UnitStatus) -> Self {
        Self {
            unit_name: unit_name.into(),
            execution_id: execution_id.into(),
            status,
            timestamp: Utc::now(),
            elapsed_seconds: None,
            error: None,
            payload: None,
            metadata: DataMap::new(),
            retryable: false,
        }
    }

    /// Creates a completed result with a payload.
    #[must_use]
    pub fn completed(
        unit_name: impl Into<String>,
        execution_id: impl Into<String>,
        payload: UnitPayload,
    ) -> Self {
        let mut result = Self::base(unit_name, execution_id, UnitStatus::Completed);
        result.payload = Some(payload);
        result
    }

    /// Creates a completed result with no payload.
    #[must_use]
    pub fn completed_empty(unit_name: impl Into<String>, execution_id: impl Into<String>) -> Self {
        Self::base(unit_name, execution_id, UnitStatus::Completed)
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(
        unit_name: impl Into<String>,
        execution_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::base(unit_name, execution_id, UnitStatus::Failed);
        result.error = Some(error.into());
        result
    }

    /// Creates a failed result that the executor may retry.
    #[must_use]
    pub fn failed_retryable(
        unit_name: impl Into<String>,
        execution_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::failed(unit_name, execution_id, error);
        result.retryable = true;
        result
    }

    /// Creates a cancelled result.
    #[must_use]
    pub fn cancelled(
        unit_name: impl Into<String>,
        execution_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let mut result = Self::base(unit_name, execution_id, UnitStatus::Cancelled);
        result.error = Some(reason.into());
        result
    }

    /// Converts a captured fault into an envelope.
    ///
    /// Cancellations become `cancelled`; every other fault becomes `failed`.
    /// The fault tag is recorded under the `fault` metadata key.
    #[must_use]
    pub fn from_fault(
        unit_name: impl Into<String>,
        execution_id: impl Into<String>,
        fault: &UnitFault,
    ) -> Self {
        let mut result = match fault {
            UnitFault::Cancelled { .. } => Self::cancelled(unit_name, execution_id, fault.to_string()),
            _ => Self::failed(unit_name, execution_id, fault.to_string()),
        };
        result.retryable = fault.is_retryable();
        result
            .metadata
            .insert(FAULT_METADATA_KEY.to_string(), serde_json::json!(fault.tag()));
        result
    }

    /// Creates the synthetic result for a unit missing from the registry.
    #[must_use]
    pub fn not_registered(unit_name: impl Into<String>, execution_id: impl Into<String>) -> Self {
        let unit_name = unit_name.into();
        let fault = UnitFault::NotRegistered {
            unit: unit_name.clone(),
        };
        Self::from_fault(unit_name, execution_id, &fault)
    }

    /// Sets the elapsed time.
    #[must_use]
    pub fn with_elapsed(mut self, seconds: f64) -> Self {
        self.elapsed_seconds = Some(seconds);
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn add_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true if the unit completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the unit failed or was cancelled.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Returns true if the result was synthesized because the unit was never registered.
    #[must_use]
    pub fn is_registration_error(&self) -> bool {
        self.fault_tag() == Some("not_registered")
    }

    /// Returns the recorded fault tag, if any.
    #[must_use]
    pub fn fault_tag(&self) -> Option<&str> {
        self.metadata
            .get(FAULT_METADATA_KEY)
            .and_then(serde_json::Value::as_str)
    }

    /// Returns the payload only if the unit completed.
    #[must_use]
    pub fn completed_payload(&self) -> Option<&UnitPayload> {
        if self.is_success() {
            self.payload.as_ref()
        } else {
            None
        }
    }

    /// Checks the status/error invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match self.status {
            UnitStatus::Completed => self.error.is_none(),
            UnitStatus::Failed | UnitStatus::Cancelled => self.error.is_some(),
            UnitStatus::Pending | UnitStatus::Running => true,
        }
    }
}
