//! Test assertions for unit results.

use crate::core::{PhaseResultSet, UnitResult, UnitStatus};

/// Asserts that the result completed.
pub fn assert_completed(result: &UnitResult) {
    assert!(
        result.is_success(),
        "Expected unit '{}' to complete, got status: {:?} ({:?})",
        result.unit_name,
        result.status,
        result.error
    );
}

/// Asserts that the result failed.
pub fn assert_failed(result: &UnitResult) {
    assert!(
        result.status == UnitStatus::Failed,
        "Expected unit '{}' to fail, got status: {:?}",
        result.unit_name,
        result.status
    );
}

/// Asserts that the result has the expected status.
pub fn assert_status(result: &UnitResult, expected: UnitStatus) {
    assert_eq!(
        result.status, expected,
        "Expected status {:?} for unit '{}', got {:?}",
        expected, result.unit_name, result.status
    );
}

/// Asserts that a phase holds a result for the unit with the given status.
pub fn assert_phase_status(set: &PhaseResultSet, unit: &str, expected: UnitStatus) {
    let Some(result) = set.get(unit) else {
        panic!(
            "Expected phase {} to hold '{}', found {:?}",
            set.phase,
            unit,
            set.unit_names()
        );
    };
    assert_status(result, expected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Phase;

    #[test]
    fn test_assert_completed() {
        assert_completed(&UnitResult::completed_empty("u", "e"));
    }

    #[test]
    #[should_panic(expected = "Expected unit 'u' to complete")]
    fn test_assert_completed_fails() {
        assert_completed(&UnitResult::failed("u", "e", "error"));
    }

    #[test]
    fn test_assert_failed() {
        assert_failed(&UnitResult::failed("u", "e", "error"));
    }

    #[test]
    fn test_assert_status() {
        assert_status(&UnitResult::cancelled("u", "e", "stop"), UnitStatus::Cancelled);
    }

    #[test]
    fn test_assert_phase_status() {
        let mut set = PhaseResultSet::new(Phase::Analysis);
        set.insert(UnitResult::completed_empty("u", "e"));
        assert_phase_status(&set, "u", UnitStatus::Completed);
    }

    #[test]
    #[should_panic(expected = "to hold 'missing'")]
    fn test_assert_phase_status_missing() {
        let set = PhaseResultSet::new(Phase::Analysis);
        assert_phase_status(&set, "missing", UnitStatus::Completed);
    }
}
