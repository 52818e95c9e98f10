//! Per-phase collection of result envelopes.

use super::{Phase, UnitResult, UnitStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All results of one phase, keyed by unit name.
///
/// Built by the phase executor while units finish, then frozen behind an
/// `Arc` for downstream phases and the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResultSet {
    /// The phase these results belong to.
    pub phase: Phase,
    /// Results keyed by unit name.
    pub results: BTreeMap<String, UnitResult>,
}

impl PhaseResultSet {
    /// Creates an empty result set.
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            results: BTreeMap::new(),
        }
    }

    /// Inserts a result under its unit name.
    ///
    /// Returns the previous result if the name was already present.
    pub fn insert(&mut self, result: UnitResult) -> Option<UnitResult> {
        self.results.insert(result.unit_name.clone(), result)
    }

    /// Returns the result for a unit.
    #[must_use]
    pub fn get(&self, unit: &str) -> Option<&UnitResult> {
        self.results.get(unit)
    }

    /// Returns the result for a unit only if it completed.
    #[must_use]
    pub fn completed(&self, unit: &str) -> Option<&UnitResult> {
        self.get(unit).filter(|r| r.is_success())
    }

    /// Returns true if the set holds a result for the unit.
    #[must_use]
    pub fn contains(&self, unit: &str) -> bool {
        self.results.contains_key(unit)
    }

    /// Returns the number of results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterates results in unit-name order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitResult> {
        self.results.values()
    }

    /// Returns the unit names in order.
    #[must_use]
    pub fn unit_names(&self) -> Vec<&str> {
        self.results.keys().map(String::as_str).collect()
    }

    /// Counts results with the given status.
    #[must_use]
    pub fn count(&self, status: UnitStatus) -> usize {
        self.iter().filter(|r| r.status == status).count()
    }

    /// Number of completed results.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count(UnitStatus::Completed)
    }

    /// Number of failed results.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(UnitStatus::Failed)
    }

    /// Number of cancelled results.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.count(UnitStatus::Cancelled)
    }

    /// Returns true if every result completed (vacuously true when empty).
    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.iter().all(UnitResult::is_success)
    }

    /// Returns the single result of a one-unit phase.
    #[must_use]
    pub fn single(&self) -> Option<&UnitResult> {
        if self.results.len() == 1 {
            self.results.values().next()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PhaseResultSet {
        let mut set = PhaseResultSet::new(Phase::Analysis);
        set.insert(UnitResult::completed_empty("a", "exec"));
        set.insert(UnitResult::failed("b", "exec", "boom"));
        set.insert(UnitResult::cancelled("c", "exec", "timeout"));
        set
    }

    #[test]
    fn test_counts() {
        let set = sample();
        assert_eq!(set.len(), 3);
        assert_eq!(set.completed_count(), 1);
        assert_eq!(set.failed_count(), 1);
        assert_eq!(set.cancelled_count(), 1);
        assert!(!set.all_completed());
    }

    #[test]
    fn test_completed_filters_failures() {
        let set = sample();
        assert!(set.completed("a").is_some());
        assert!(set.completed("b").is_none());
        assert!(set.get("b").is_some());
        assert!(set.completed("missing").is_none());
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let mut set = PhaseResultSet::new(Phase::Synthesis);
        assert!(set.insert(UnitResult::failed("x", "exec", "first")).is_none());
        assert!(set.insert(UnitResult::completed_empty("x", "exec")).is_some());
        assert_eq!(set.len(), 1);
        assert!(set.single().unwrap().is_success());
    }

    #[test]
    fn test_unit_names_sorted() {
        let set = sample();
        assert_eq!(set.unit_names(), vec!["a", "b", "c"]);
    }
}
