//! Controller-owned execution context.

use super::RunIdentity;
use crate::core::Phase;
use crate::errors::DesignflowError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// States of the pipeline controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    /// Nothing has run yet.
    NotStarted,
    /// Phase 1 units are running.
    Phase1Running,
    /// The synthesis unit is running.
    Phase2Running,
    /// The validation unit is running.
    Phase3Running,
    /// All phases ran and the artifact was built.
    Completed,
    /// A configuration error stopped the run.
    Failed,
}

impl ControllerState {
    /// The running state for a phase.
    #[must_use]
    pub fn running(phase: Phase) -> Self {
        match phase {
            Phase::Analysis => Self::Phase1Running,
            Phase::Synthesis => Self::Phase2Running,
            Phase::Validation => Self::Phase3Running,
        }
    }

    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this state.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        use ControllerState::{
            Completed, Failed, NotStarted, Phase1Running, Phase2Running, Phase3Running,
        };
        matches!(
            (self, next),
            (NotStarted, Phase1Running)
                | (Phase1Running, Phase2Running)
                | (Phase2Running, Phase3Running)
                | (Phase3Running, Completed)
                | (NotStarted | Phase1Running | Phase2Running | Phase3Running, Failed)
        )
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Phase1Running => "phase1_running",
            Self::Phase2Running => "phase2_running",
            Self::Phase3Running => "phase3_running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Mutable state of one run, owned by the controller.
///
/// Identity is fixed at construction. Warnings, errors and the controller
/// state accumulate as the run progresses.
#[derive(Debug)]
pub struct ExecutionContext {
    identity: RunIdentity,
    started: Instant,
    state: RwLock<ControllerState>,
    warnings: RwLock<Vec<String>>,
    errors: RwLock<Vec<String>>,
}

impl ExecutionContext {
    /// Creates a context in the `NotStarted` state.
    #[must_use]
    pub fn new(identity: RunIdentity) -> Self {
        Self {
            identity,
            started: Instant::now(),
            state: RwLock::new(ControllerState::NotStarted),
            warnings: RwLock::new(Vec::new()),
            errors: RwLock::new(Vec::new()),
        }
    }

    /// The run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// The execution id.
    #[must_use]
    pub fn execution_id(&self) -> &str {
        &self.identity.execution_id
    }

    /// Wall-clock seconds since the context was created.
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        crate::utils::elapsed_seconds(self.started)
    }

    /// The current controller state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        *self.state.read()
    }

    /// Moves to the next state, rejecting illegal transitions.
    pub fn transition(&self, next: ControllerState) -> Result<(), DesignflowError> {
        let mut state = self.state.write();
        if !state.can_transition_to(next) {
            return Err(DesignflowError::Internal(format!(
                "illegal controller transition {} -> {next}",
                *state
            )));
        }
        *state = next;
        Ok(())
    }

    /// Records a warning.
    pub fn add_warning(&self, warning: impl Into<String>) {
        self.warnings.write().push(warning.into());
    }

    /// Records an error.
    pub fn add_error(&self, error: impl Into<String>) {
        self.errors.write().push(error.into());
    }

    /// All warnings so far.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.read().clone()
    }

    /// All errors so far.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.read().clone()
    }
}
