//! The result of one pipeline run.

use crate::artifact::FinalArtifact;
use crate::core::{Phase, PhaseResultSet, RunStatus};
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Everything a run produced.
///
/// A `completed` run always carries all three phase sets and the artifact,
/// even when individual units failed. A `failed` run stopped on a
/// configuration error; its `errors` list is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Overall status.
    pub status: RunStatus,
    /// Workflow name from the request.
    pub workflow_name: String,
    /// Execution id of the run.
    pub execution_id: String,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run ended.
    pub completed_at: Timestamp,
    /// Wall-clock seconds from start to the terminal state.
    pub total_elapsed_seconds: f64,
    /// Phase 1 results, if the phase ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Arc<PhaseResultSet>>,
    /// Phase 2 results, if the phase ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<Arc<PhaseResultSet>>,
    /// Phase 3 results, if the phase ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Arc<PhaseResultSet>>,
    /// The final artifact of a completed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<FinalArtifact>,
    /// Controller-level errors.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Warnings recorded during the run.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl PipelineOutcome {
    /// Returns true if the run completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Results of one phase, if it ran.
    #[must_use]
    pub fn phase(&self, phase: Phase) -> Option<&PhaseResultSet> {
        match phase {
            Phase::Analysis => self.analysis.as_deref(),
            Phase::Synthesis => self.synthesis.as_deref(),
            Phase::Validation => self.validation.as_deref(),
        }
    }

    /// Process exit code: `0` when completed, `1` when failed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    /// Machine-readable status of the run.
    ///
    /// Always holds `status`, `execution_id`, `total_elapsed_seconds` and
    /// `errors`. Completed runs add the artifact id and confidence.
    #[must_use]
    pub fn status_object(&self) -> Value {
        let mut status = json!({
            "status": self.status,
            "execution_id": self.execution_id,
            "total_elapsed_seconds": self.total_elapsed_seconds,
            "errors": self.errors,
            "warnings": self.warnings,
        });
        if let (Some(artifact), Some(map)) = (&self.artifact, status.as_object_mut()) {
            map.insert("artifact_id".into(), json!(artifact.id));
            map.insert("confidence_score".into(), json!(artifact.confidence_score));
        }
        status
    }
}
