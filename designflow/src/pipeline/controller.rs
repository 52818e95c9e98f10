//! Pipeline controller: three phases in strict sequence, then aggregation.
//!
//! ```text
//! NotStarted -> Phase1Running -> Phase2Running -> Phase3Running -> Completed
//!      \______________\_______________\________________\_______-> Failed
//! ```
//!
//! Only configuration errors (checked before phase 1) and internal state
//! errors move the run to `Failed`. Unit faults are absorbed by the phase
//! executor and surface as warnings and gaps.

use super::executor::PhaseExecutor;
use super::outcome::PipelineOutcome;
use super::plan::PipelinePlan;
use crate::artifact::{aggregate, FinalArtifact};
use crate::config::OrchestratorConfig;
use crate::context::{ControllerState, ExecutionContext, PipelineRequest, RunIdentity, UnitInput};
use crate::core::{Phase, PhaseResultSet, RunStatus};
use crate::errors::{ConfigurationError, DesignflowError};
use crate::events::{self, EventSink, NoOpEventSink};
use crate::observability::pipeline_span;
use crate::registry::UnitRegistry;
use crate::utils::now_utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

#[derive(Default)]
struct PhaseSets {
    analysis: Option<Arc<PhaseResultSet>>,
    synthesis: Option<Arc<PhaseResultSet>>,
    validation: Option<Arc<PhaseResultSet>>,
}

/// Runs the plan's units phase by phase and builds the final artifact.
pub struct PipelineController {
    registry: Arc<UnitRegistry>,
    config: Arc<OrchestratorConfig>,
    plan: PipelinePlan,
    sink: Arc<dyn EventSink>,
}

impl PipelineController {
    /// Creates a controller for the code-to-design plan with no event sink.
    #[must_use]
    pub fn new(registry: Arc<UnitRegistry>, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
            plan: PipelinePlan::code_to_design(),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Replaces the plan.
    #[must_use]
    pub fn with_plan(mut self, plan: PipelinePlan) -> Self {
        self.plan = plan;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The plan in use.
    #[must_use]
    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }

    /// The orchestrator settings.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The unit registry.
    #[must_use]
    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Configuration checks run before any phase.
    fn preflight(&self, request: &PipelineRequest) -> Result<(), ConfigurationError> {
        self.config.validate()?;
        self.plan.validate()?;
        if self.registry.is_empty() {
            return Err(ConfigurationError::empty_registry());
        }
        request.validate()
    }

    /// Runs the pipeline to a terminal state.
    ///
    /// Never returns an error: configuration problems produce a `failed`
    /// outcome with a non-empty error list.
    pub async fn run(&self, request: PipelineRequest) -> PipelineOutcome {
        let identity = RunIdentity::from_optional(request.execution_id.as_deref());
        let span = pipeline_span(&identity.execution_id);
        self.run_inner(identity, request).instrument(span).await
    }

    async fn run_inner(&self, identity: RunIdentity, request: PipelineRequest) -> PipelineOutcome {
        let ctx = ExecutionContext::new(identity);
        let request = Arc::new(request);
        info!(workflow = %request.workflow_name, location = %request.repository.location, "pipeline started");
        self.sink.emit(
            events::PIPELINE_STARTED,
            Some(json!({
                "execution_id": ctx.execution_id(),
                "workflow_name": request.workflow_name,
                "repository": request.repository.location,
            })),
        );

        if let Err(err) = self.preflight(&request) {
            error!(code = err.code(), error = %err, "pipeline configuration rejected");
            ctx.add_error(err.to_string());
            return self.fail(&ctx, &request, PhaseSets::default());
        }

        for name in self.plan.unregistered(&self.registry) {
            warn!(unit = %name, "planned unit is not registered");
            ctx.add_warning(format!("unit '{name}' is not registered"));
        }

        let mut sets = PhaseSets::default();
        match self.run_phases(&ctx, &request, &mut sets).await {
            Ok(artifact) => self.complete(&ctx, &request, sets, artifact),
            Err(err) => {
                error!(error = %err, "pipeline aborted");
                ctx.add_error(err.to_string());
                self.fail(&ctx, &request, sets)
            }
        }
    }

    async fn run_phases(
        &self,
        ctx: &ExecutionContext,
        request: &Arc<PipelineRequest>,
        sets: &mut PhaseSets,
    ) -> Result<FinalArtifact, DesignflowError> {
        let executor = PhaseExecutor::new(self.config.clone(), self.sink.clone());
        let base = UnitInput::new(ctx.identity().clone(), request.clone());

        let analysis = self
            .run_phase(&executor, ctx, Phase::Analysis, &self.plan.analysis, &base)
            .await?;
        sets.analysis = Some(analysis.clone());

        let synthesis_input = base.with_analysis(analysis.clone());
        let synthesis = self
            .run_phase(
                &executor,
                ctx,
                Phase::Synthesis,
                std::slice::from_ref(&self.plan.synthesis),
                &synthesis_input,
            )
            .await?;
        sets.synthesis = Some(synthesis.clone());

        let validation_input = synthesis_input.with_synthesis(synthesis.clone());
        let validation = self
            .run_phase(
                &executor,
                ctx,
                Phase::Validation,
                std::slice::from_ref(&self.plan.validation),
                &validation_input,
            )
            .await?;
        sets.validation = Some(validation.clone());

        ctx.transition(ControllerState::Completed)?;
        Ok(aggregate(
            ctx.execution_id(),
            analysis,
            synthesis,
            validation,
            now_utc(),
        ))
    }

    async fn run_phase(
        &self,
        executor: &PhaseExecutor,
        ctx: &ExecutionContext,
        phase: Phase,
        units: &[String],
        input: &UnitInput,
    ) -> Result<Arc<PhaseResultSet>, DesignflowError> {
        ctx.transition(ControllerState::running(phase))?;
        self.sink.emit(
            events::PHASE_STARTED,
            Some(json!({
                "execution_id": ctx.execution_id(),
                "phase": phase,
                "units": units,
            })),
        );

        let scheduled = PhaseExecutor::resolve(&self.registry, units);
        let set = executor.execute(phase, scheduled, input).await;

        for result in set.iter().filter(|r| !r.is_success()) {
            ctx.add_warning(format!(
                "{phase}/{}: {}",
                result.unit_name,
                result.error.as_deref().unwrap_or("did not complete")
            ));
        }
        self.sink.emit(
            events::PHASE_COMPLETED,
            Some(json!({
                "execution_id": ctx.execution_id(),
                "phase": phase,
                "completed": set.completed_count(),
                "failed": set.failed_count(),
                "cancelled": set.cancelled_count(),
            })),
        );
        Ok(Arc::new(set))
    }

    fn complete(
        &self,
        ctx: &ExecutionContext,
        request: &PipelineRequest,
        sets: PhaseSets,
        artifact: FinalArtifact,
    ) -> PipelineOutcome {
        let elapsed = ctx.elapsed_seconds();
        info!(
            elapsed_seconds = elapsed,
            confidence = artifact.confidence_score,
            warnings = ctx.warnings().len(),
            "pipeline completed"
        );
        self.sink.emit(
            events::PIPELINE_COMPLETED,
            Some(json!({
                "execution_id": ctx.execution_id(),
                "artifact_id": artifact.id,
                "confidence_score": artifact.confidence_score,
                "total_elapsed_seconds": elapsed,
            })),
        );
        self.outcome(ctx, request, RunStatus::Completed, sets, Some(artifact), elapsed)
    }

    fn fail(
        &self,
        ctx: &ExecutionContext,
        request: &PipelineRequest,
        sets: PhaseSets,
    ) -> PipelineOutcome {
        if let Err(err) = ctx.transition(ControllerState::Failed) {
            warn!(error = %err, "controller already terminal");
        }
        let elapsed = ctx.elapsed_seconds();
        self.sink.emit(
            events::PIPELINE_FAILED,
            Some(json!({
                "execution_id": ctx.execution_id(),
                "errors": ctx.errors(),
                "total_elapsed_seconds": elapsed,
            })),
        );
        self.outcome(ctx, request, RunStatus::Failed, sets, None, elapsed)
    }

    #[allow(clippy::unused_self)]
    fn outcome(
        &self,
        ctx: &ExecutionContext,
        request: &PipelineRequest,
        status: RunStatus,
        sets: PhaseSets,
        artifact: Option<FinalArtifact>,
        elapsed: f64,
    ) -> PipelineOutcome {
        PipelineOutcome {
            status,
            workflow_name: request.workflow_name.clone(),
            execution_id: ctx.execution_id().to_string(),
            started_at: ctx.identity().started_at,
            completed_at: now_utc(),
            total_elapsed_seconds: elapsed,
            analysis: sets.analysis,
            synthesis: sets.synthesis,
            validation: sets.validation,
            artifact,
            errors: ctx.errors(),
            warnings: ctx.warnings(),
        }
    }
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("plan", &self.plan)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigErrorKind;
    use crate::events::{CollectingEventSink, MockEventSink};
    use crate::pipeline::RetryConfig;
    use crate::testing::{FailingUnit, SuccessUnit};
    use tempfile::TempDir;

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::default().with_retry(RetryConfig::no_retry())
    }

    fn small_registry() -> Arc<UnitRegistry> {
        let registry = UnitRegistry::new();
        registry.register_fn("a", || Arc::new(SuccessUnit::new("a")));
        registry.register_fn("b", || Arc::new(FailingUnit::new("b", "boom")));
        registry.register_fn("s", || Arc::new(SuccessUnit::new("s")));
        registry.register_fn("v", || Arc::new(SuccessUnit::new("v")));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_empty_registry_fails_before_any_phase() {
        let dir = TempDir::new().unwrap();
        let mut sink = MockEventSink::new();
        sink.expect_emit()
            .withf(|event, _| event == events::PIPELINE_STARTED)
            .times(1)
            .return_const(());
        sink.expect_emit()
            .withf(|event, data| {
                event == events::PIPELINE_FAILED
                    && data.as_ref().is_some_and(|d| {
                        d["errors"][0]
                            .as_str()
                            .is_some_and(|e| e.contains(ConfigErrorKind::EmptyRegistry.code()))
                    })
            })
            .times(1)
            .return_const(());

        let controller = PipelineController::new(Arc::new(UnitRegistry::new()), config())
            .with_event_sink(Arc::new(sink));
        let outcome = controller
            .run(PipelineRequest::new(dir.path().to_string_lossy()))
            .await;

        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(outcome.analysis.is_none());
        assert!(outcome.artifact.is_none());
        assert_eq!(outcome.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_repository_fails() {
        let controller = PipelineController::new(small_registry(), config());
        let outcome = controller
            .run(PipelineRequest::new("/definitely/not/a/repo").with_execution_id("exec_bad"))
            .await;

        assert_eq!(outcome.status, RunStatus::Failed);
        assert_eq!(outcome.execution_id, "exec_bad");
        assert!(outcome.errors[0].contains("CONFIG-INVALID-REPOSITORY"));
        assert_eq!(outcome.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_path_like_execution_id_fails_before_any_phase() {
        let dir = TempDir::new().unwrap();
        let controller = PipelineController::new(small_registry(), config());
        let outcome = controller
            .run(PipelineRequest::new(dir.path().to_string_lossy()).with_execution_id("../escaped"))
            .await;

        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(outcome.analysis.is_none());
        assert!(outcome.errors[0].contains("CONFIG-MALFORMED-INPUT"));
    }

    #[tokio::test]
    async fn test_invalid_settings_fail() {
        let dir = TempDir::new().unwrap();
        let controller =
            PipelineController::new(small_registry(), config().with_max_parallel_units(0));
        let outcome = controller
            .run(PipelineRequest::new(dir.path().to_string_lossy()))
            .await;
        assert!(outcome.errors[0].contains("CONFIG-INVALID-SETTINGS"));
    }

    #[tokio::test]
    async fn test_phases_run_in_order() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(CollectingEventSink::new());
        let controller = PipelineController::new(small_registry(), config())
            .with_plan(PipelinePlan::new(["a", "b"], "s", "v"))
            .with_event_sink(sink.clone());

        let outcome = controller
            .run(PipelineRequest::new(dir.path().to_string_lossy()).with_execution_id("exec_ok"))
            .await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.phase(Phase::Analysis).map(PhaseResultSet::len), Some(2));
        assert_eq!(outcome.warnings, vec!["analysis/b: boom"]);

        let phase_events: Vec<String> = sink
            .events_of_type("phase.")
            .into_iter()
            .map(|(t, d)| format!("{t}:{}", d.unwrap()["phase"].as_str().unwrap()))
            .collect();
        assert_eq!(
            phase_events,
            vec![
                "phase.started:analysis",
                "phase.completed:analysis",
                "phase.started:synthesis",
                "phase.completed:synthesis",
                "phase.started:validation",
                "phase.completed:validation",
            ]
        );
        let types = sink.event_types();
        assert_eq!(types.first().map(String::as_str), Some(events::PIPELINE_STARTED));
        assert_eq!(types.last().map(String::as_str), Some(events::PIPELINE_COMPLETED));
    }

    #[tokio::test]
    async fn test_unregistered_plan_unit_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let controller = PipelineController::new(small_registry(), config())
            .with_plan(PipelinePlan::new(["a", "ghost"], "s", "v"));

        let outcome = controller
            .run(PipelineRequest::new(dir.path().to_string_lossy()))
            .await;

        assert_eq!(outcome.status, RunStatus::Completed);
        let ghost = outcome.phase(Phase::Analysis).unwrap().get("ghost").unwrap();
        assert!(ghost.is_registration_error());
        assert!(outcome.warnings.contains(&"unit 'ghost' is not registered".to_string()));
    }
}
