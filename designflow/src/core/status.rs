//! Unit status, run status and phase enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Unit is scheduled but has not started.
    #[default]
    Pending,
    /// Unit is currently running.
    Running,
    /// Unit completed successfully.
    Completed,
    /// Unit failed.
    Failed,
    /// Unit was cancelled before finishing.
    Cancelled,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl UnitStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

/// The terminal status of a whole pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// All three phases ran and the artifact was built.
    Completed,
    /// The controller hit a configuration error.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One of the three pipeline phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Independent analysis units, run in parallel.
    Analysis,
    /// The single synthesis unit.
    Synthesis,
    /// The single validation unit.
    Validation,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Self; 3] = [Self::Analysis, Self::Synthesis, Self::Validation];

    /// Returns the 1-based phase number.
    #[must_use]
    pub fn number(&self) -> u8 {
        match self {
            Self::Analysis => 1,
            Self::Synthesis => 2,
            Self::Validation => 3,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => write!(f, "analysis"),
            Self::Synthesis => write!(f, "synthesis"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_status_display() {
        assert_eq!(UnitStatus::Completed.to_string(), "completed");
        assert_eq!(UnitStatus::Failed.to_string(), "failed");
        assert_eq!(UnitStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_unit_status_is_terminal() {
        assert!(UnitStatus::Completed.is_terminal());
        assert!(UnitStatus::Failed.is_terminal());
        assert!(UnitStatus::Cancelled.is_terminal());
        assert!(!UnitStatus::Pending.is_terminal());
        assert!(!UnitStatus::Running.is_terminal());
    }

    #[test]
    fn test_unit_status_serialize() {
        let json = serde_json::to_string(&UnitStatus::Cancelled).unwrap();
        assert_eq!(json, r#""cancelled""#);

        let deserialized: UnitStatus = serde_json::from_str(r#""running""#).unwrap();
        assert_eq!(deserialized, UnitStatus::Running);
    }

    #[test]
    fn test_phase_order() {
        let numbers: Vec<u8> = Phase::ALL.iter().map(Phase::number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(Phase::Analysis < Phase::Validation);
    }
}
