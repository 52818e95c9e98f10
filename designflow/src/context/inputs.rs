//! Per-invocation input handed to a unit.

use super::{PipelineRequest, RunIdentity};
use crate::core::{PhaseResultSet, UnitPayload, UnitResult};
use crate::errors::UnitFault;
use std::sync::Arc;

/// The input of one unit invocation.
///
/// Created fresh per invocation. Upstream results are frozen behind `Arc`s,
/// so a unit sees exactly what the previous phases finalized.
#[derive(Debug, Clone)]
pub struct UnitInput {
    unit_name: String,
    identity: RunIdentity,
    request: Arc<PipelineRequest>,
    analysis: Option<Arc<PhaseResultSet>>,
    synthesis: Option<Arc<PhaseResultSet>>,
}

impl UnitInput {
    /// Creates a phase-1 input.
    #[must_use]
    pub fn new(identity: RunIdentity, request: Arc<PipelineRequest>) -> Self {
        Self {
            unit_name: String::new(),
            identity,
            request,
            analysis: None,
            synthesis: None,
        }
    }

    /// Attaches the phase-1 results.
    #[must_use]
    pub fn with_analysis(mut self, analysis: Arc<PhaseResultSet>) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// Attaches the phase-2 results.
    #[must_use]
    pub fn with_synthesis(mut self, synthesis: Arc<PhaseResultSet>) -> Self {
        self.synthesis = Some(synthesis);
        self
    }

    /// Returns a copy addressed to a specific unit.
    #[must_use]
    pub fn for_unit(&self, unit_name: impl Into<String>) -> Self {
        let mut input = self.clone();
        input.unit_name = unit_name.into();
        input
    }

    /// The unit this input is addressed to.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        &self.unit_name
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

    /// The original pipeline request.
    #[must_use]
    pub fn request(&self) -> &PipelineRequest {
        &self.request
    }

    /// Phase-1 results, if this is a phase 2 or 3 input.
    #[must_use]
    pub fn analysis(&self) -> Option<&PhaseResultSet> {
        self.analysis.as_deref()
    }

    /// Phase-2 results, if this is a phase 3 input.
    #[must_use]
    pub fn synthesis(&self) -> Option<&PhaseResultSet> {
        self.synthesis.as_deref()
    }

    /// The completed payload of a phase-1 unit. Failed or missing units read as absent.
    #[must_use]
    pub fn upstream_payload(&self, unit: &str) -> Option<&UnitPayload> {
        self.analysis()
            .and_then(|set| set.get(unit))
            .and_then(UnitResult::completed_payload)
    }

    /// The completed phase-2 payload, if any.
    #[must_use]
    pub fn synthesis_payload(&self) -> Option<&UnitPayload> {
        self.synthesis()
            .and_then(|set| set.iter().find(|r| r.is_success()))
            .and_then(UnitResult::completed_payload)
    }

    /// Builds a completed result for this unit.
    #[must_use]
    pub fn complete(&self, payload: UnitPayload) -> UnitResult {
        UnitResult::completed(&self.unit_name, self.execution_id(), payload)
    }

    /// Builds a failed result for this unit.
    #[must_use]
    pub fn fail(&self, error: impl Into<String>) -> UnitResult {
        UnitResult::failed(&self.unit_name, self.execution_id(), error)
    }

    /// Builds a result from a captured fault.
    #[must_use]
    pub fn fault(&self, fault: &UnitFault) -> UnitResult {
        UnitResult::from_fault(&self.unit_name, self.execution_id(), fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Phase, RepositoryAnalysis};

    fn input_with_analysis() -> UnitInput {
        let identity = RunIdentity::with_execution_id("exec_t");
        let request = Arc::new(PipelineRequest::new("."));
        let mut set = PhaseResultSet::new(Phase::Analysis);
        set.insert(UnitResult::completed(
            "ok",
            "exec_t",
            UnitPayload::RepositoryAnalysis(RepositoryAnalysis::default()),
        ));
        set.insert(UnitResult::failed("bad", "exec_t", "boom"));
        UnitInput::new(identity, request).with_analysis(Arc::new(set))
    }

    #[test]
    fn test_upstream_payload_treats_failures_as_absent() {
        let input = input_with_analysis();
        assert!(input.upstream_payload("ok").is_some());
        assert!(input.upstream_payload("bad").is_none());
        assert!(input.upstream_payload("missing").is_none());
        assert!(input.synthesis_payload().is_none());
    }

    #[test]
    fn test_for_unit_addresses_results() {
        let input = input_with_analysis().for_unit("design_architect");
        let result = input.fail("nope");
        assert_eq!(result.unit_name, "design_architect");
        assert_eq!(result.execution_id, "exec_t");
    }
}
