use crate::core::Phase;
use tracing::{info_span, Span};

/// Span covering a whole run.
#[must_use]
pub fn pipeline_span(execution_id: &str) -> Span {
    info_span!("pipeline", execution_id = %execution_id)
}

/// Span covering one phase.
#[must_use]
pub fn phase_span(execution_id: &str, phase: Phase) -> Span {
    info_span!("phase", execution_id = %execution_id, phase = %phase)
}

/// Span covering every attempt of one unit.
#[must_use]
pub fn unit_span(execution_id: &str, phase: Phase, unit: &str) -> Span {
    info_span!("unit", execution_id = %execution_id, phase = %phase, unit = %unit)
}
