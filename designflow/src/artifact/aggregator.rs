//! Builds the final artifact from whatever the phases produced.
//!
//! Every field is read from a completed result of the matching payload
//! family. Anything missing, failed or cancelled falls back to an empty
//! value, so aggregation cannot fail.

use super::FinalArtifact;
use crate::core::{DataMap, PhaseResultSet, UnitPayload};
use crate::utils::{artifact_id, Timestamp};
use serde_json::json;
use std::sync::Arc;

/// Confidence reported when validation produced no confidence values.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// First completed payload in the set that `pick` accepts.
///
/// Result sets iterate in unit-name order, so the choice is deterministic.
fn find<'a, T>(
    set: &'a PhaseResultSet,
    pick: impl Fn(&'a UnitPayload) -> Option<&'a T>,
) -> Option<&'a T> {
    set.iter()
        .filter_map(|r| r.completed_payload())
        .find_map(pick)
}

fn confidence(validation: &PhaseResultSet) -> f64 {
    let values: Vec<f64> = validation
        .iter()
        .filter_map(|r| r.completed_payload())
        .flat_map(UnitPayload::confidence_values)
        .collect();
    if values.is_empty() {
        return NEUTRAL_CONFIDENCE;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    mean.clamp(0.0, 1.0)
}

fn executive_summary(
    analysis: &PhaseResultSet,
    synthesis: &PhaseResultSet,
    validation: &PhaseResultSet,
) -> String {
    let mut parts = Vec::new();

    if !analysis.is_empty() {
        parts.push(format!(
            "Analysis phase: {} of {} units completed.",
            analysis.completed_count(),
            analysis.len()
        ));
    }
    if find(analysis, UnitPayload::as_repository_analysis).is_some() {
        parts.push("Repository analysis completed successfully.".to_string());
    }
    if let Some(docs) = find(analysis, UnitPayload::as_documentation_synthesis) {
        parts.push(format!(
            "Documentation accuracy score: {:.2}.",
            docs.documentation_accuracy_score
        ));
    }
    if find(synthesis, UnitPayload::as_design_architecture).is_some() {
        parts.push("Comprehensive design documentation generated.".to_string());
    }
    if let Some(qa) = find(validation, UnitPayload::as_qa_validation) {
        parts.push(format!(
            "Generated {} clarification questions for validation.",
            qa.clarification_questions.len()
        ));
    }

    if parts.is_empty() {
        "Workflow execution completed.".to_string()
    } else {
        parts.join(" ")
    }
}

fn gaps(sets: [&PhaseResultSet; 3]) -> Vec<String> {
    sets.into_iter()
        .flat_map(|set| {
            set.iter().filter(|r| !r.is_success()).map(move |r| {
                let reason = r
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("status {}", r.status));
                format!("{}/{}: {reason}", set.phase, r.unit_name)
            })
        })
        .collect()
}

fn phase_counts(set: &PhaseResultSet) -> serde_json::Value {
    json!({
        "total": set.len(),
        "completed": set.completed_count(),
        "failed": set.failed_count(),
        "cancelled": set.cancelled_count(),
    })
}

/// Builds the final artifact for a run.
///
/// Never fails: each field takes its value from a completed payload of the
/// matching family or falls back to an empty default.
#[must_use]
pub fn aggregate(
    execution_id: &str,
    analysis: Arc<PhaseResultSet>,
    synthesis: Arc<PhaseResultSet>,
    validation: Arc<PhaseResultSet>,
    generated_at: Timestamp,
) -> FinalArtifact {
    let repo = find(&analysis, UnitPayload::as_repository_analysis);
    let docs = find(&analysis, UnitPayload::as_documentation_synthesis);
    let tests = find(&analysis, UnitPayload::as_test_analysis);
    let devops = find(&analysis, UnitPayload::as_devops_design);
    let design = find(&synthesis, UnitPayload::as_design_architecture);
    let qa = find(&validation, UnitPayload::as_qa_validation);

    let mut metadata = DataMap::new();
    metadata.insert(
        "phases".into(),
        json!({
            "analysis": phase_counts(&analysis),
            "synthesis": phase_counts(&synthesis),
            "validation": phase_counts(&validation),
        }),
    );

    FinalArtifact {
        id: artifact_id(execution_id, &generated_at),
        execution_id: execution_id.to_string(),
        generated_at,
        executive_summary: executive_summary(&analysis, &synthesis, &validation),
        system_overview: design.map(|d| d.system_overview.clone()).unwrap_or_default(),
        architecture_diagram: design
            .map(|d| d.architecture_diagram.clone())
            .unwrap_or_default(),
        component_specifications: design
            .map(|d| d.component_specifications.clone())
            .unwrap_or_default(),
        api_documentation: design
            .map(|d| d.api_documentation.clone())
            .unwrap_or_default(),
        data_flow_diagrams: design
            .map(|d| d.data_flow_diagrams.clone())
            .unwrap_or_default(),
        code_quality_metrics: repo
            .map(|r| r.code_quality_metrics.clone())
            .unwrap_or_default(),
        test_strategy: tests
            .map(|t| t.proposed_test_strategy.clone())
            .unwrap_or_default(),
        deployment_architecture: devops
            .map(|d| d.deployment_architecture.clone())
            .unwrap_or_default(),
        operational_requirements: devops
            .map(|d| d.operational_requirements.clone())
            .unwrap_or_default(),
        documentation_gaps: docs
            .map(|d| d.major_discrepancies.clone())
            .unwrap_or_default(),
        validation_questions: qa
            .map(|q| q.clarification_questions.clone())
            .unwrap_or_default(),
        confidence_score: confidence(&validation),
        gaps: gaps([&analysis, &synthesis, &validation]),
        metadata,
        analysis,
        synthesis,
        validation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        DesignArchitecture, DocumentationSynthesis, Phase, QaValidation, UnitResult,
    };
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    fn set(phase: Phase, results: Vec<UnitResult>) -> Arc<PhaseResultSet> {
        let mut set = PhaseResultSet::new(phase);
        for result in results {
            set.insert(result);
        }
        Arc::new(set)
    }

    fn qa(scores: &[(&str, f64)]) -> UnitResult {
        UnitResult::completed(
            "qa_validator",
            "e",
            UnitPayload::QaValidation(QaValidation {
                confidence_scores: scores.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
                clarification_questions: vec![json!("q1"), json!("q2")],
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_everything_missing_uses_defaults() {
        let artifact = aggregate(
            "e",
            set(Phase::Analysis, vec![]),
            set(Phase::Synthesis, vec![]),
            set(Phase::Validation, vec![]),
            at(),
        );

        assert_eq!(artifact.id, "design_doc_e_20240501_123000");
        assert!((artifact.confidence_score - NEUTRAL_CONFIDENCE).abs() < f64::EPSILON);
        assert_eq!(artifact.executive_summary, "Workflow execution completed.");
        assert!(artifact.system_overview.is_empty());
        assert!(artifact.component_specifications.is_empty());
        assert!(artifact.gaps.is_empty());
        assert!(artifact.analysis.is_empty());
    }

    #[test]
    fn test_confidence_is_mean_of_validation_scores() {
        let artifact = aggregate(
            "e",
            set(Phase::Analysis, vec![]),
            set(Phase::Synthesis, vec![]),
            set(Phase::Validation, vec![qa(&[("a", 1.0), ("b", 0.0), ("c", 0.5)])]),
            at(),
        );

        assert!((artifact.confidence_score - 0.5).abs() < 1e-9);
        assert_eq!(artifact.validation_questions.len(), 2);
        assert!(artifact
            .executive_summary
            .ends_with("Generated 2 clarification questions for validation."));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut custom = DataMap::new();
        custom.insert("confidence".into(), json!(7.5));
        let artifact = aggregate(
            "e",
            set(Phase::Analysis, vec![]),
            set(Phase::Synthesis, vec![]),
            set(
                Phase::Validation,
                vec![UnitResult::completed("v", "e", UnitPayload::Custom(custom))],
            ),
            at(),
        );
        assert!((artifact.confidence_score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failed_validation_gives_neutral_confidence() {
        let artifact = aggregate(
            "e",
            set(Phase::Analysis, vec![]),
            set(Phase::Synthesis, vec![]),
            set(Phase::Validation, vec![UnitResult::failed("qa_validator", "e", "boom")]),
            at(),
        );
        assert!((artifact.confidence_score - NEUTRAL_CONFIDENCE).abs() < f64::EPSILON);
        assert_eq!(artifact.gaps, vec!["validation/qa_validator: boom"]);
    }

    #[test]
    fn test_fields_read_from_completed_payloads_only() {
        let design = UnitResult::completed(
            "design_architect",
            "e",
            UnitPayload::DesignArchitecture(DesignArchitecture {
                system_overview: "overview".into(),
                ..Default::default()
            }),
        );
        let docs = UnitResult::completed(
            "documentation_synthesizer",
            "e",
            UnitPayload::DocumentationSynthesis(DocumentationSynthesis {
                documentation_accuracy_score: 0.75,
                major_discrepancies: vec![json!("stale README")],
                ..Default::default()
            }),
        );
        let artifact = aggregate(
            "e",
            set(
                Phase::Analysis,
                vec![docs, UnitResult::failed("test_analyst", "e", "not implemented")],
            ),
            set(Phase::Synthesis, vec![design]),
            set(Phase::Validation, vec![]),
            at(),
        );

        assert_eq!(artifact.system_overview, "overview");
        assert_eq!(artifact.documentation_gaps, vec![json!("stale README")]);
        assert!(artifact.test_strategy.is_empty());
        assert_eq!(
            artifact.executive_summary,
            "Analysis phase: 1 of 2 units completed. Documentation accuracy score: 0.75. \
             Comprehensive design documentation generated."
        );
        assert_eq!(artifact.gaps, vec!["analysis/test_analyst: not implemented"]);
        assert_eq!(artifact.metadata["phases"]["analysis"]["failed"], json!(1));
    }

    #[test]
    fn test_fingerprint_ignores_ids_and_timings() {
        let build = |exec: &str, elapsed: f64| {
            aggregate(
                exec,
                set(
                    Phase::Analysis,
                    vec![UnitResult::completed_empty("a", exec).with_elapsed(elapsed)],
                ),
                set(Phase::Synthesis, vec![]),
                set(Phase::Validation, vec![qa(&[("a", 1.0)])]),
                Utc::now(),
            )
        };

        let first = build("exec_1", 0.1);
        let second = build("exec_2", 9.0);
        assert_ne!(first.id, second.id);
        assert_eq!(first.content_fingerprint(), second.content_fingerprint());
    }
}
