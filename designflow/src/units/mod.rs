//! The unit contract and built-in units.
//!
//! Every analyzer, synthesizer and validator is a [`Unit`]: one async
//! method taking a [`UnitInput`] and returning a [`UnitResult`]. A unit must
//! not let a fault escape; the executor still guards the task boundary
//! (timeouts, panics, cancellation) for units that do.

mod design;
mod inventory;
mod validation;

pub use design::DesignSkeletonUnit;
pub use inventory::RepositoryInventoryUnit;
pub use validation::CoverageValidationUnit;

/// Registry names of the code-to-design units.
pub mod names {
    /// Structural repository analysis (phase 1).
    pub const REPOSITORY_ANALYZER: &str = "repository_analyzer";
    /// Documentation reconciliation (phase 1).
    pub const DOCUMENTATION_SYNTHESIZER: &str = "documentation_synthesizer";
    /// Test suite analysis (phase 1).
    pub const TEST_ANALYST: &str = "test_analyst";
    /// Deployment design (phase 1).
    pub const DEVOPS_DESIGNER: &str = "devops_designer";
    /// Design synthesis (phase 2).
    pub const DESIGN_ARCHITECT: &str = "design_architect";
    /// Validation (phase 3).
    pub const QA_VALIDATOR: &str = "qa_validator";
}

use crate::context::UnitInput;
use crate::core::{UnitPayload, UnitResult};
use crate::errors::UnitFault;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline units.
///
/// Registry instances are shared across phases and may be invoked
/// concurrently, so implementations must not hold unguarded mutable state.
#[async_trait]
pub trait Unit: Send + Sync + Debug {
    /// Returns the name of the unit.
    fn name(&self) -> &str;

    /// Executes the unit.
    ///
    /// Internal faults are reported as a `failed` result, never propagated.
    async fn execute(&self, input: &UnitInput) -> UnitResult;
}

/// A unit backed by a fallible closure.
///
/// `Ok(payload)` becomes a completed result; `Err` becomes a failed result
/// carrying the full `anyhow` context chain.
pub struct FnUnit<F>
where
    F: Fn(&UnitInput) -> anyhow::Result<UnitPayload> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnUnit<F>
where
    F: Fn(&UnitInput) -> anyhow::Result<UnitPayload> + Send + Sync,
{
    /// Creates a new function-based unit.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnUnit<F>
where
    F: Fn(&UnitInput) -> anyhow::Result<UnitPayload> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnUnit").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Unit for FnUnit<F>
where
    F: Fn(&UnitInput) -> anyhow::Result<UnitPayload> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: &UnitInput) -> UnitResult {
        match (self.func)(input) {
            Ok(payload) => input.complete(payload),
            Err(err) => input.fault(&UnitFault::from(err)),
        }
    }
}

/// Placeholder for a unit whose logic does not exist yet.
///
/// Always returns `failed` with the error `"not implemented"`.
#[derive(Debug, Clone)]
pub struct NotImplementedUnit {
    name: String,
}

impl NotImplementedUnit {
    /// Creates a placeholder unit.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Unit for NotImplementedUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: &UnitInput) -> UnitResult {
        input.fault(&UnitFault::NotImplemented)
    }
}
