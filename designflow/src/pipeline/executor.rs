//! Phase executor: runs a set of units concurrently and collects every outcome.
//!
//! Each unit runs in its own task. Timeouts, panics and cancellation are
//! caught at the task boundary and folded into that unit's envelope, so one
//! unit's fault never reaches its siblings or the phase. The returned
//! [`PhaseResultSet`] always holds exactly one entry per requested name.

use super::retry::{decide, RetryConfig, RetryDecision};
use crate::cancellation::CancellationToken;
use crate::config::OrchestratorConfig;
use crate::context::UnitInput;
use crate::core::{
    Phase, PhaseResultSet, UnitResult, UnitStatus, ATTEMPTS_METADATA_KEY, FAULT_METADATA_KEY,
};
use crate::errors::UnitFault;
use crate::events::{self, EventSink};
use crate::observability::{phase_span, unit_span};
use crate::registry::UnitRegistry;
use crate::units::Unit;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, info, warn, Instrument};

/// Error text of a unit skipped through `UnitSettings.enabled = false`.
pub const DISABLED_MESSAGE: &str = "unit disabled by configuration";

/// A unit name paired with its registry lookup.
///
/// `unit` is `None` when the name was not registered; such entries are
/// reported as registration failures without being scheduled.
#[derive(Debug, Clone)]
pub struct ScheduledUnit {
    /// Requested name.
    pub name: String,
    /// Resolved instance.
    pub unit: Option<Arc<dyn Unit>>,
}

impl ScheduledUnit {
    /// Creates an entry for a resolved unit.
    #[must_use]
    pub fn resolved(name: impl Into<String>, unit: Arc<dyn Unit>) -> Self {
        Self {
            name: name.into(),
            unit: Some(unit),
        }
    }

    /// Creates an entry for a name the registry does not know.
    #[must_use]
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: None,
        }
    }
}

/// Timeout and attempt limits for one unit.
#[derive(Debug, Clone)]
struct UnitPolicy {
    timeout: Duration,
    max_attempts: usize,
    retry: RetryConfig,
}

/// Runs one phase's units under a concurrency bound.
#[derive(Clone)]
pub struct PhaseExecutor {
    config: Arc<OrchestratorConfig>,
    sink: Arc<dyn EventSink>,
}

impl PhaseExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(config: Arc<OrchestratorConfig>, sink: Arc<dyn EventSink>) -> Self {
        Self { config, sink }
    }

    /// Looks up every requested name before anything is scheduled.
    ///
    /// Duplicate names keep their first occurrence.
    #[must_use]
    pub fn resolve(registry: &UnitRegistry, names: &[String]) -> Vec<ScheduledUnit> {
        let mut seen = HashSet::new();
        names
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .map(|name| match registry.resolve(name) {
                Ok(unit) => ScheduledUnit::resolved(name.clone(), unit),
                Err(err) => {
                    warn!(unit = %name, error = %err, "unit not registered");
                    ScheduledUnit::unresolved(name.clone())
                }
            })
            .collect()
    }

    fn policy_for(&self, unit: &str) -> UnitPolicy {
        UnitPolicy {
            timeout: self.config.unit_timeout(unit),
            max_attempts: self.config.max_attempts(unit),
            retry: self.config.retry.clone(),
        }
    }

    /// Executes every scheduled unit and waits for all of them.
    pub async fn execute(
        &self,
        phase: Phase,
        scheduled: Vec<ScheduledUnit>,
        input: &UnitInput,
    ) -> PhaseResultSet {
        let execution_id = input.execution_id().to_string();
        let span = phase_span(&execution_id, phase);
        self.execute_inner(phase, scheduled, input)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        phase: Phase,
        scheduled: Vec<ScheduledUnit>,
        input: &UnitInput,
    ) -> PhaseResultSet {
        let execution_id = input.execution_id().to_string();
        let mut results = PhaseResultSet::new(phase);
        let token = Arc::new(CancellationToken::new());
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_units.max(1)));
        let mut pending = FuturesUnordered::new();

        for entry in scheduled {
            if results.contains(&entry.name) {
                continue;
            }
            let Some(unit) = entry.unit else {
                self.record(&mut results, UnitResult::not_registered(&entry.name, &execution_id));
                continue;
            };
            if !self.config.is_enabled(&entry.name) {
                let disabled = UnitResult::cancelled(&entry.name, &execution_id, DISABLED_MESSAGE)
                    .add_metadata(FAULT_METADATA_KEY, json!("disabled"));
                self.record(&mut results, disabled);
                continue;
            }

            let name = entry.name;
            let unit_input = input.for_unit(&name);
            let policy = self.policy_for(&name);
            let task = run_unit(
                unit,
                unit_input,
                policy,
                semaphore.clone(),
                token.clone(),
            )
            .instrument(unit_span(&execution_id, phase, &name));
            let handle = tokio::spawn(task);
            pending.push(handle.map(move |joined| (name, joined)));
        }

        info!(scheduled = pending.len(), "phase started");

        let mut deadline = self
            .config
            .phase_timeout()
            .and_then(|limit| tokio::time::Instant::now().checked_add(limit).map(|at| (at, limit)));

        while !pending.is_empty() {
            let next = match deadline {
                Some((at, limit)) => {
                    tokio::select! {
                        next = pending.next() => next,
                        () = tokio::time::sleep_until(at) => {
                            warn!(limit_seconds = limit.as_secs_f64(), "phase timeout, cancelling running units");
                            token.cancel(format!("phase timeout of {:.1}s elapsed", limit.as_secs_f64()));
                            deadline = None;
                            continue;
                        }
                    }
                }
                None => pending.next().await,
            };
            let Some((name, joined)) = next else { break };
            let result = match joined {
                Ok(result) => normalize(result, &name, &execution_id),
                Err(join_error) => {
                    let fault = join_fault(&name, join_error);
                    UnitResult::from_fault(&name, &execution_id, &fault)
                }
            };
            self.record(&mut results, result);
        }

        info!(
            completed = results.completed_count(),
            failed = results.failed_count(),
            cancelled = results.cancelled_count(),
            "phase finished"
        );
        results
    }

    fn record(&self, results: &mut PhaseResultSet, result: UnitResult) {
        let event = match result.status {
            UnitStatus::Completed => {
                debug!(unit = %result.unit_name, "unit completed");
                events::UNIT_COMPLETED
            }
            UnitStatus::Cancelled => {
                warn!(unit = %result.unit_name, error = ?result.error, "unit cancelled");
                events::UNIT_CANCELLED
            }
            _ => {
                warn!(unit = %result.unit_name, error = ?result.error, "unit failed");
                events::UNIT_FAILED
            }
        };
        self.sink.emit(
            event,
            Some(json!({
                "execution_id": result.execution_id,
                "phase": results.phase,
                "unit": result.unit_name,
                "error": result.error,
                "elapsed_seconds": result.elapsed_seconds,
            })),
        );
        results.insert(result);
    }
}

impl std::fmt::Debug for PhaseExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseExecutor")
            .field("max_parallel_units", &self.config.max_parallel_units)
            .finish_non_exhaustive()
    }
}

/// Runs one unit to a final envelope: waits for a permit, then attempts
/// under the timeout until the result is final or attempts run out.
async fn run_unit(
    unit: Arc<dyn Unit>,
    input: UnitInput,
    policy: UnitPolicy,
    semaphore: Arc<Semaphore>,
    token: Arc<CancellationToken>,
) -> UnitResult {
    let name = input.unit_name().to_string();
    let cancelled = |token: &CancellationToken| {
        input.fault(&UnitFault::Cancelled {
            unit: name.clone(),
            reason: token.reason().unwrap_or_else(|| "cancelled".to_string()),
        })
    };

    let permit = tokio::select! {
        biased;
        () = token.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    };
    let Some(_permit) = permit else {
        return cancelled(&token);
    };

    let started = Instant::now();
    let mut attempts = 0usize;
    let result = loop {
        attempts += 1;
        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => break cancelled(&token),
            outcome = tokio::time::timeout(policy.timeout, unit.execute(&input)) => outcome,
        };
        let result = outcome.unwrap_or_else(|_| {
            input.fault(&UnitFault::Timeout {
                unit: name.clone(),
                seconds: policy.timeout.as_secs_f64(),
            })
        });

        match decide(&result, attempts, policy.max_attempts, &policy.retry) {
            RetryDecision::Retry(delay) => {
                debug!(
                    attempt = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = ?result.error,
                    "retrying unit"
                );
                tokio::select! {
                    biased;
                    () = token.cancelled() => break cancelled(&token),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            RetryDecision::GiveUp | RetryDecision::Done => break result,
        }
    };

    result
        .with_elapsed(started.elapsed().as_secs_f64())
        .add_metadata(ATTEMPTS_METADATA_KEY, json!(attempts))
}

/// Forces a unit's envelope to honour the status/error invariant and to
/// carry the requested name and run id.
fn normalize(mut result: UnitResult, name: &str, execution_id: &str) -> UnitResult {
    if result.unit_name != name {
        result.unit_name = name.to_string();
    }
    if result.execution_id != execution_id {
        result.execution_id = execution_id.to_string();
    }
    match result.status {
        UnitStatus::Completed => {
            if let Some(error) = result.error.take() {
                result.metadata.insert("reported_error".into(), json!(error));
            }
        }
        UnitStatus::Failed | UnitStatus::Cancelled => {
            if result.error.is_none() {
                result.error = Some(format!("unit reported {} without an error message", result.status));
            }
        }
        UnitStatus::Pending | UnitStatus::Running => {
            let status = result.status;
            result.status = UnitStatus::Failed;
            result.payload = None;
            result.error = Some(format!("unit returned non-terminal status '{status}'"));
        }
    }
    result
}

fn join_fault(name: &str, error: JoinError) -> UnitFault {
    if error.is_cancelled() {
        return UnitFault::Cancelled {
            unit: name.to_string(),
            reason: "task aborted".to_string(),
        };
    }
    let message = match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string()),
        Err(other) => other.to_string(),
    };
    UnitFault::Panicked {
        unit: name.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{PipelineRequest, RunIdentity};
    use crate::events::CollectingEventSink;
    use crate::testing::{FailingUnit, PanickingUnit, SlowUnit, SuccessUnit};

    fn input() -> UnitInput {
        UnitInput::new(
            RunIdentity::with_execution_id("exec_phase"),
            Arc::new(PipelineRequest::new(".")),
        )
    }

    fn executor(config: OrchestratorConfig) -> (PhaseExecutor, Arc<CollectingEventSink>) {
        let sink = Arc::new(CollectingEventSink::new());
        (PhaseExecutor::new(Arc::new(config), sink.clone()), sink)
    }

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig::default().with_retry(RetryConfig::no_retry())
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let (exec, sink) = executor(fast_config());
        let scheduled = vec![
            ScheduledUnit::resolved("a", Arc::new(SuccessUnit::new("a"))),
            ScheduledUnit::resolved("b", Arc::new(FailingUnit::new("b", "boom"))),
            ScheduledUnit::resolved("c", Arc::new(PanickingUnit::new("c"))),
        ];

        let set = exec.execute(Phase::Analysis, scheduled, &input()).await;

        assert_eq!(set.len(), 3);
        assert!(set.get("a").unwrap().is_success());
        assert_eq!(set.get("b").unwrap().error.as_deref(), Some("boom"));
        let panicked = set.get("c").unwrap();
        assert_eq!(panicked.status, UnitStatus::Failed);
        assert_eq!(panicked.fault_tag(), Some("panic"));
        assert_eq!(sink.events_of_type("unit.").len(), 3);
    }

    #[tokio::test]
    async fn test_unresolved_name_gets_registration_error() {
        let registry = UnitRegistry::new();
        registry.register_fn("a", || Arc::new(SuccessUnit::new("a")));
        let names = vec!["a".to_string(), "ghost".to_string(), "a".to_string()];

        let scheduled = PhaseExecutor::resolve(&registry, &names);
        assert_eq!(scheduled.len(), 2);

        let (exec, _) = executor(fast_config());
        let set = exec.execute(Phase::Analysis, scheduled, &input()).await;
        let ghost = set.get("ghost").unwrap();
        assert_eq!(ghost.status, UnitStatus::Failed);
        assert!(ghost.is_registration_error());
        assert!(ghost.error.as_deref().unwrap().starts_with("registration error"));
    }

    #[tokio::test]
    async fn test_unit_timeout() {
        let config = fast_config().with_unit_timeout_seconds(0.05);
        let (exec, _) = executor(config);
        let scheduled = vec![ScheduledUnit::resolved(
            "slow",
            Arc::new(SlowUnit::new("slow", Duration::from_secs(5))),
        )];

        let set = exec.execute(Phase::Analysis, scheduled, &input()).await;
        let slow = set.get("slow").unwrap();
        assert_eq!(slow.status, UnitStatus::Failed);
        assert_eq!(slow.fault_tag(), Some("timeout"));
        assert_eq!(slow.metadata[ATTEMPTS_METADATA_KEY], json!(1));
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let config = OrchestratorConfig::default()
            .with_unit_timeout_seconds(0.02)
            .with_retry(
                RetryConfig::new()
                    .with_max_attempts(3)
                    .with_base_delay_ms(1)
                    .with_jitter(crate::pipeline::JitterStrategy::None),
            );
        let (exec, _) = executor(config);
        let scheduled = vec![ScheduledUnit::resolved(
            "slow",
            Arc::new(SlowUnit::new("slow", Duration::from_secs(5))),
        )];

        let set = exec.execute(Phase::Analysis, scheduled, &input()).await;
        assert_eq!(set.get("slow").unwrap().metadata[ATTEMPTS_METADATA_KEY], json!(3));
    }

    #[tokio::test]
    async fn test_phase_timeout_cancels_running_units() {
        let config = fast_config().with_phase_timeout_seconds(0.05);
        let (exec, sink) = executor(config);
        let scheduled = vec![
            ScheduledUnit::resolved("fast", Arc::new(SuccessUnit::new("fast"))),
            ScheduledUnit::resolved(
                "slow",
                Arc::new(SlowUnit::new("slow", Duration::from_secs(5))),
            ),
        ];

        let started = Instant::now();
        let set = exec.execute(Phase::Analysis, scheduled, &input()).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(set.get("fast").unwrap().is_success());
        let slow = set.get("slow").unwrap();
        assert_eq!(slow.status, UnitStatus::Cancelled);
        assert!(slow.error.as_deref().unwrap().contains("phase timeout"));
        assert_eq!(sink.events_of_type(events::UNIT_CANCELLED).len(), 1);
    }

    #[tokio::test]
    async fn test_concurrency_bound() {
        let config = fast_config().with_max_parallel_units(1);
        let (exec, _) = executor(config);
        let scheduled = (0..3)
            .map(|i| {
                let name = format!("s{i}");
                ScheduledUnit::resolved(
                    name.clone(),
                    Arc::new(SlowUnit::new(name, Duration::from_millis(40))),
                )
            })
            .collect();

        let started = Instant::now();
        let set = exec.execute(Phase::Analysis, scheduled, &input()).await;

        assert_eq!(set.completed_count(), 3);
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_disabled_unit_is_cancelled() {
        let config = fast_config().with_unit_settings(
            "off",
            crate::config::UnitSettings {
                enabled: false,
                ..Default::default()
            },
        );
        let (exec, _) = executor(config);
        let off = Arc::new(crate::testing::MockUnit::new("off"));
        let scheduled = vec![ScheduledUnit::resolved("off", off.clone())];

        let set = exec.execute(Phase::Analysis, scheduled, &input()).await;
        let result = set.get("off").unwrap();
        assert_eq!(result.status, UnitStatus::Cancelled);
        assert_eq!(result.error.as_deref(), Some(DISABLED_MESSAGE));
        assert_eq!(off.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_phase() {
        let (exec, _) = executor(fast_config());
        let set = exec.execute(Phase::Analysis, Vec::new(), &input()).await;
        assert!(set.is_empty());
    }

    #[test]
    fn test_normalize_enforces_invariant() {
        let mut bad = UnitResult::completed_empty("other", "x");
        bad.error = Some("oops".to_string());
        let fixed = normalize(bad, "real", "exec");
        assert_eq!(fixed.unit_name, "real");
        assert_eq!(fixed.execution_id, "exec");
        assert!(fixed.error.is_none());
        assert!(fixed.is_consistent());

        let mut silent = UnitResult::completed_empty("real", "exec");
        silent.status = UnitStatus::Failed;
        assert!(normalize(silent, "real", "exec").error.is_some());

        let mut running = UnitResult::completed_empty("real", "exec");
        running.status = UnitStatus::Running;
        assert_eq!(normalize(running, "real", "exec").status, UnitStatus::Failed);
    }
}
