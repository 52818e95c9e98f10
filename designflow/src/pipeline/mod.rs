//! Pipeline planning and execution.
//!
//! This module provides:
//! - The phase plan (which units run in which phase)
//! - The phase executor (bounded concurrent units with fault isolation)
//! - Retry policy for unit attempts
//! - The controller that sequences the phases and builds the artifact

mod controller;
mod executor;
mod outcome;
mod plan;
mod retry;

pub use controller::PipelineController;
pub use executor::{PhaseExecutor, ScheduledUnit, DISABLED_MESSAGE};
pub use outcome::PipelineOutcome;
pub use plan::PipelinePlan;
pub use retry::{decide, BackoffStrategy, JitterStrategy, RetryConfig, RetryDecision};
