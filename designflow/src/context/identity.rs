//! Run identity shared by every unit invocation of one pipeline run.

use crate::utils::{generate_execution_id, now_utc, Timestamp};
use serde::{Deserialize, Serialize};

/// Immutable identity of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// Opaque execution identifier.
    pub execution_id: String,
    /// When the run started.
    pub started_at: Timestamp,
}

impl RunIdentity {
    /// Creates an identity with a generated `exec_<timestamp>` id.
    #[must_use]
    pub fn generate() -> Self {
        let started_at = now_utc();
        Self {
            execution_id: generate_execution_id(&started_at),
            started_at,
        }
    }

    /// Creates an identity with a caller-supplied id.
    #[must_use]
    pub fn with_execution_id(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            started_at: now_utc(),
        }
    }

    /// Uses the supplied id when present, otherwise generates one.
    #[must_use]
    pub fn from_optional(execution_id: Option<&str>) -> Self {
        execution_id.map_or_else(Self::generate, Self::with_execution_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_prefix() {
        let identity = RunIdentity::generate();
        assert!(identity.execution_id.starts_with("exec_"));
        assert_eq!(identity.execution_id.len(), "exec_20240101_000000".len());
    }

    #[test]
    fn test_caller_supplied_id_kept() {
        let identity = RunIdentity::from_optional(Some("my-run"));
        assert_eq!(identity.execution_id, "my-run");
    }
}
