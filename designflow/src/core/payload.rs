//! Typed payload families carried inside a result envelope.
//!
//! Each family mirrors what one kind of unit produces. `Custom` keeps the
//! door open for units that return arbitrary structured data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open, deterministically ordered JSON object.
pub type DataMap = BTreeMap<String, serde_json::Value>;

/// Structural analysis of the repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryAnalysis {
    /// Repository metadata and statistics.
    pub repo_metadata: DataMap,
    /// Architectural patterns and structure.
    pub architecture_analysis: DataMap,
    /// Code quality metrics.
    pub code_quality_metrics: DataMap,
    /// Detected design patterns and conventions.
    pub detected_patterns: Vec<serde_json::Value>,
    /// File and directory structure analysis.
    pub file_structure: DataMap,
    /// Internal and external dependencies.
    pub dependencies: DataMap,
}

/// Reconciliation of existing documentation against the code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentationSynthesis {
    /// Accuracy of existing documentation in `[0, 1]`.
    pub documentation_accuracy_score: f64,
    /// Major discrepancies between code and docs.
    pub major_discrepancies: Vec<serde_json::Value>,
    /// Features present in code but not documented.
    pub undocumented_features: Vec<serde_json::Value>,
    /// Notes on reconciling code and documentation.
    pub reconciliation_notes: DataMap,
    /// Analysis of existing documentation.
    pub existing_docs_analysis: DataMap,
}

/// Analysis of the test suite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestAnalysis {
    /// Coverage analysis.
    pub test_coverage_analysis: DataMap,
    /// Identified testing gaps.
    pub testing_gaps: Vec<serde_json::Value>,
    /// Proposed test strategy.
    pub proposed_test_strategy: DataMap,
    /// Manual test scenarios.
    pub manual_test_scenarios: Vec<serde_json::Value>,
    /// Test quality metrics.
    pub test_quality_metrics: DataMap,
}

/// Deployment and operations design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevOpsDesign {
    /// Deployment architecture description.
    pub deployment_architecture: String,
    /// Infrastructure design.
    pub infrastructure_design: DataMap,
    /// Operational requirements.
    pub operational_requirements: Vec<serde_json::Value>,
    /// Monitoring and alerting strategy.
    pub monitoring_strategy: DataMap,
    /// Identified deployment patterns.
    pub deployment_patterns: Vec<serde_json::Value>,
}

/// The synthesized design produced in phase 2.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignArchitecture {
    /// System overview prose.
    pub system_overview: String,
    /// Text architecture diagram.
    pub architecture_diagram: String,
    /// Component specifications.
    pub component_specifications: Vec<serde_json::Value>,
    /// API interfaces and contracts.
    pub api_documentation: DataMap,
    /// Data flow diagrams.
    pub data_flow_diagrams: Vec<String>,
    /// Identified design principles.
    pub design_principles: Vec<String>,
}

/// Validation findings produced in phase 3.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaValidation {
    /// Questions for human clarification.
    pub clarification_questions: Vec<serde_json::Value>,
    /// Points for human review.
    pub validation_points: Vec<serde_json::Value>,
    /// Confidence per area.
    pub confidence_scores: BTreeMap<String, f64>,
    /// Areas requiring priority attention.
    pub priority_areas: Vec<serde_json::Value>,
    /// Consistency check results.
    pub consistency_check_results: DataMap,
}

/// Unit-specific payload of a result envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitPayload {
    /// Repository structure analysis.
    RepositoryAnalysis(RepositoryAnalysis),
    /// Documentation reconciliation.
    DocumentationSynthesis(DocumentationSynthesis),
    /// Test suite analysis.
    TestAnalysis(TestAnalysis),
    /// Deployment design.
    #[serde(rename = "devops_design")]
    DevOpsDesign(DevOpsDesign),
    /// Synthesized design.
    DesignArchitecture(DesignArchitecture),
    /// Validation findings.
    QaValidation(QaValidation),
    /// Anything else.
    Custom(DataMap),
}

impl UnitPayload {
    /// Returns the payload family name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RepositoryAnalysis(_) => "repository_analysis",
            Self::DocumentationSynthesis(_) => "documentation_synthesis",
            Self::TestAnalysis(_) => "test_analysis",
            Self::DevOpsDesign(_) => "devops_design",
            Self::DesignArchitecture(_) => "design_architecture",
            Self::QaValidation(_) => "qa_validation",
            Self::Custom(_) => "custom",
        }
    }

    /// Returns every numeric confidence value carried by the payload.
    ///
    /// Validation payloads contribute their `confidence_scores`. Custom
    /// payloads contribute a top-level numeric `confidence` and the numeric
    /// members of a `confidence_scores` object. Non-finite values are dropped.
    #[must_use]
    pub fn confidence_values(&self) -> Vec<f64> {
        let values: Vec<f64> = match self {
            Self::QaValidation(qa) => qa.confidence_scores.values().copied().collect(),
            Self::Custom(map) => {
                let mut values = Vec::new();
                if let Some(v) = map.get("confidence").and_then(serde_json::Value::as_f64) {
                    values.push(v);
                }
                if let Some(scores) = map
                    .get("confidence_scores")
                    .and_then(serde_json::Value::as_object)
                {
                    values.extend(scores.values().filter_map(serde_json::Value::as_f64));
                }
                values
            }
            _ => Vec::new(),
        };
        values.into_iter().filter(|v| v.is_finite()).collect()
    }

    /// Returns the repository analysis, if this is one.
    #[must_use]
    pub fn as_repository_analysis(&self) -> Option<&RepositoryAnalysis> {
        match self {
            Self::RepositoryAnalysis(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the documentation synthesis, if this is one.
    #[must_use]
    pub fn as_documentation_synthesis(&self) -> Option<&DocumentationSynthesis> {
        match self {
            Self::DocumentationSynthesis(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the test analysis, if this is one.
    #[must_use]
    pub fn as_test_analysis(&self) -> Option<&TestAnalysis> {
        match self {
            Self::TestAnalysis(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the deployment design, if this is one.
    #[must_use]
    pub fn as_devops_design(&self) -> Option<&DevOpsDesign> {
        match self {
            Self::DevOpsDesign(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the synthesized design, if this is one.
    #[must_use]
    pub fn as_design_architecture(&self) -> Option<&DesignArchitecture> {
        match self {
            Self::DesignArchitecture(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the validation findings, if this is one.
    #[must_use]
    pub fn as_qa_validation(&self) -> Option<&QaValidation> {
        match self {
            Self::QaValidation(p) => Some(p),
            _ => None,
        }
    }
}
