//! Core domain model types for designflow.
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - Unit status, run status and phase enums
//! - The result envelope with factory methods
//! - Typed payload families
//! - Per-phase result sets

mod payload;
mod phase;
mod result;
mod status;

pub use payload::{
    DataMap, DesignArchitecture, DevOpsDesign, DocumentationSynthesis, QaValidation,
    RepositoryAnalysis, TestAnalysis, UnitPayload,
};
pub use phase::PhaseResultSet;
pub use result::{UnitResult, ATTEMPTS_METADATA_KEY, FAULT_METADATA_KEY};
pub use status::{Phase, RunStatus, UnitStatus};
