//! # Designflow
//!
//! Phased unit orchestration that turns a source repository into a design
//! document.
//!
//! A run executes three phases in strict sequence:
//!
//! - **Analysis**: independent units run concurrently under a parallelism
//!   bound; one unit's fault never affects its siblings
//! - **Synthesis**: a single unit consumes every analysis result
//! - **Validation**: a single unit consumes analysis and synthesis results
//!
//! The aggregator then builds a [`FinalArtifact`](artifact::FinalArtifact)
//! from whatever completed, with a confidence score in `[0, 1]`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use designflow::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let registry = Arc::new(UnitRegistry::with_builtin_units());
//! let controller = PipelineController::new(registry, OrchestratorConfig::default());
//!
//! let outcome = controller.run(PipelineRequest::new("./my-repo")).await;
//! println!("{}", outcome.status_object());
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    missing_docs,
    rust_2018_idioms
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifact;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod testing;
pub mod units;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::artifact::{aggregate, render, ArtifactStore, FinalArtifact};
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{OrchestratorConfig, UnitSettings};
    pub use crate::context::{
        ExecutionContext, OutputFormat, PipelineRequest, RepositoryConfig, RunIdentity,
        UnitInput,
    };
    pub use crate::core::{
        DataMap, Phase, PhaseResultSet, RunStatus, UnitPayload, UnitResult, UnitStatus,
    };
    pub use crate::errors::{ConfigurationError, DesignflowError, UnitFault};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{
        PhaseExecutor, PipelineController, PipelineOutcome, PipelinePlan, RetryConfig,
    };
    pub use crate::registry::UnitRegistry;
    pub use crate::units::{FnUnit, NotImplementedUnit, Unit};
    pub use crate::utils::{iso_timestamp, Timestamp};
}
