//! Testing utilities for designflow pipelines.
//!
//! This module provides:
//! - Mock units covering success, failure, panics and slow work
//! - A recording unit that captures the upstream results it receives
//! - Assertions for unit results and phase result sets

mod assertions;
mod mocks;

pub use assertions::{assert_completed, assert_failed, assert_phase_status, assert_status};
pub use mocks::{
    FailingUnit, MockUnit, PanickingUnit, RecordedExecution, RecordingUnit, SlowUnit,
    SuccessUnit,
};
