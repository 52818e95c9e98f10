//! Coverage-based validation of the synthesized design.

use super::names::QA_VALIDATOR;
use super::Unit;
use crate::context::UnitInput;
use crate::core::{DataMap, QaValidation, UnitPayload, UnitResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;

/// Confidence key for the phase-2 design.
pub const DESIGN_CONFIDENCE_KEY: &str = "synthesis";

/// Prefix of the per-analysis-unit confidence keys.
pub const ANALYSIS_CONFIDENCE_PREFIX: &str = "analysis:";

/// Confidence key of one analysis unit. Never equal to
/// [`DESIGN_CONFIDENCE_KEY`], whatever the unit is called.
#[must_use]
pub fn analysis_confidence_key(unit: &str) -> String {
    format!("{ANALYSIS_CONFIDENCE_PREFIX}{unit}")
}

/// Scores each analysis unit 1.0 when it completed and 0.0 otherwise, scores
/// the design the same way, and asks one clarification question per gap.
#[derive(Debug, Clone, Default)]
pub struct CoverageValidationUnit;

impl CoverageValidationUnit {
    /// Creates the unit.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn gap_reason(result: &UnitResult) -> String {
    result
        .error
        .clone()
        .unwrap_or_else(|| format!("status {}", result.status))
}

#[async_trait]
impl Unit for CoverageValidationUnit {
    fn name(&self) -> &str {
        QA_VALIDATOR
    }

    async fn execute(&self, input: &UnitInput) -> UnitResult {
        let mut confidence_scores = BTreeMap::new();
        let mut clarification_questions = Vec::new();
        let mut validation_points = Vec::new();
        let mut priority_areas = Vec::new();

        let mut completed = 0usize;
        let mut scheduled = 0usize;
        for result in input.analysis().into_iter().flat_map(|set| set.iter()) {
            scheduled += 1;
            if result.is_success() {
                completed += 1;
                confidence_scores.insert(analysis_confidence_key(&result.unit_name), 1.0);
                validation_points.push(json!(format!(
                    "Review findings of '{}' against the code.",
                    result.unit_name
                )));
            } else {
                confidence_scores.insert(analysis_confidence_key(&result.unit_name), 0.0);
                clarification_questions.push(json!(format!(
                    "Analysis '{}' did not complete ({}). Can its findings be supplied manually?",
                    result.unit_name,
                    gap_reason(result)
                )));
                priority_areas.push(json!(result.unit_name));
            }
        }

        let design = input.synthesis().and_then(|set| set.iter().next());
        let design_completed = design.is_some_and(UnitResult::is_success);
        confidence_scores.insert(
            DESIGN_CONFIDENCE_KEY.to_string(),
            if design_completed { 1.0 } else { 0.0 },
        );
        if !design_completed {
            let reason = design.map_or_else(|| "no result".to_string(), gap_reason);
            clarification_questions.push(json!(format!(
                "The design synthesis did not complete ({reason}). Which architecture should the document describe?"
            )));
            priority_areas.push(json!(DESIGN_CONFIDENCE_KEY));
        }

        let mut consistency_check_results = DataMap::new();
        consistency_check_results.insert("analysis_completed".into(), json!(completed));
        consistency_check_results.insert("analysis_scheduled".into(), json!(scheduled));
        consistency_check_results.insert("design_completed".into(), json!(design_completed));

        input.complete(UnitPayload::QaValidation(QaValidation {
            clarification_questions,
            validation_points,
            confidence_scores,
            priority_areas,
            consistency_check_results,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{PipelineRequest, RunIdentity};
    use crate::core::{Phase, PhaseResultSet};
    use std::sync::Arc;

    fn run_input(design_ok: bool) -> UnitInput {
        let mut analysis = PhaseResultSet::new(Phase::Analysis);
        analysis.insert(UnitResult::completed_empty("a", "e"));
        analysis.insert(UnitResult::failed("b", "e", "boom"));

        let mut synthesis = PhaseResultSet::new(Phase::Synthesis);
        synthesis.insert(if design_ok {
            UnitResult::completed_empty("design_architect", "e")
        } else {
            UnitResult::failed("design_architect", "e", "crashed")
        });

        UnitInput::new(
            RunIdentity::with_execution_id("e"),
            Arc::new(PipelineRequest::new(".")),
        )
        .with_analysis(Arc::new(analysis))
        .with_synthesis(Arc::new(synthesis))
        .for_unit(QA_VALIDATOR)
    }

    #[tokio::test]
    async fn test_scores_and_questions() {
        let result = CoverageValidationUnit::new().execute(&run_input(true)).await;
        let qa = result.payload.as_ref().unwrap().as_qa_validation().unwrap();

        assert_eq!(qa.confidence_scores.get("analysis:a"), Some(&1.0));
        assert_eq!(qa.confidence_scores.get("analysis:b"), Some(&0.0));
        assert_eq!(qa.confidence_scores.get(DESIGN_CONFIDENCE_KEY), Some(&1.0));
        assert_eq!(qa.clarification_questions.len(), 1);
        assert!(qa.clarification_questions[0].as_str().unwrap().contains("boom"));
        assert_eq!(qa.priority_areas, vec![json!("b")]);
    }

    #[tokio::test]
    async fn test_failed_design_lowers_confidence() {
        let result = CoverageValidationUnit::new().execute(&run_input(false)).await;
        let qa = result.payload.as_ref().unwrap().as_qa_validation().unwrap();

        assert_eq!(qa.confidence_scores.get(DESIGN_CONFIDENCE_KEY), Some(&0.0));
        assert_eq!(qa.clarification_questions.len(), 2);
        assert_eq!(
            qa.consistency_check_results["design_completed"],
            json!(false)
        );
    }

    #[tokio::test]
    async fn test_unit_named_like_design_key_keeps_its_own_score() {
        let mut analysis = PhaseResultSet::new(Phase::Analysis);
        analysis.insert(UnitResult::failed(DESIGN_CONFIDENCE_KEY, "e", "boom"));
        analysis.insert(UnitResult::failed("design", "e", "boom"));
        let mut synthesis = PhaseResultSet::new(Phase::Synthesis);
        synthesis.insert(UnitResult::completed_empty("design_architect", "e"));

        let input = UnitInput::new(
            RunIdentity::with_execution_id("e"),
            Arc::new(PipelineRequest::new(".")),
        )
        .with_analysis(Arc::new(analysis))
        .with_synthesis(Arc::new(synthesis))
        .for_unit(QA_VALIDATOR);
        let result = CoverageValidationUnit::new().execute(&input).await;
        let qa = result.payload.as_ref().unwrap().as_qa_validation().unwrap();

        assert_eq!(qa.confidence_scores.len(), 3);
        assert_eq!(qa.confidence_scores.get(DESIGN_CONFIDENCE_KEY), Some(&1.0));
        assert_eq!(
            qa.confidence_scores.get(&analysis_confidence_key(DESIGN_CONFIDENCE_KEY)),
            Some(&0.0)
        );
        assert_eq!(qa.confidence_scores.get("analysis:design"), Some(&0.0));
    }

    #[tokio::test]
    async fn test_no_upstream_at_all() {
        let input = UnitInput::new(
            RunIdentity::with_execution_id("e"),
            Arc::new(PipelineRequest::new(".")),
        )
        .for_unit(QA_VALIDATOR);
        let result = CoverageValidationUnit::new().execute(&input).await;
        let qa = result.payload.as_ref().unwrap().as_qa_validation().unwrap();

        assert_eq!(qa.confidence_scores.len(), 1);
        assert_eq!(qa.consistency_check_results["analysis_scheduled"], json!(0));
    }
}
