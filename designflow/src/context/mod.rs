//! Run-scoped context.
//!
//! This module provides:
//! - The immutable run identity
//! - The caller's pipeline request and its validation
//! - The per-invocation unit input
//! - The controller-owned execution context and state machine

mod execution;
mod identity;
mod inputs;
mod request;

pub use execution::{ControllerState, ExecutionContext};
pub use identity::RunIdentity;
pub use inputs::UnitInput;
pub use request::{
    AnalysisConfig, DocumentationConfig, OutputFormat, PipelineRequest, RepositoryConfig,
    validate_execution_id, DEFAULT_WORKFLOW_NAME,
};
