//! The final design document and everything that consumes it.
//!
//! - [`aggregate`] builds a [`FinalArtifact`] from the three phase result sets
//! - [`render`] turns it into markdown, JSON or HTML
//! - [`ArtifactStore`] persists a run under the output directory

mod aggregator;
mod render;
mod store;

pub use aggregator::{aggregate, NEUTRAL_CONFIDENCE};
pub use render::render;
pub use store::ArtifactStore;

use crate::core::{DataMap, PhaseResultSet};
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The terminal aggregate of one run.
///
/// Built once by [`aggregate`] and never mutated afterwards. Phase result
/// sets are shared, not copied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalArtifact {
    /// `design_doc_<execution_id>_<YYYYMMDD_HHMMSS>`.
    pub id: String,
    /// The run this artifact belongs to.
    pub execution_id: String,
    /// When the artifact was built.
    pub generated_at: Timestamp,

    /// Fixed-format sentences describing what completed.
    pub executive_summary: String,

    /// From the synthesized design.
    pub system_overview: String,
    /// From the synthesized design.
    pub architecture_diagram: String,
    /// From the synthesized design.
    pub component_specifications: Vec<Value>,
    /// From the synthesized design.
    pub api_documentation: DataMap,
    /// From the synthesized design.
    pub data_flow_diagrams: Vec<String>,

    /// From the repository analysis.
    pub code_quality_metrics: DataMap,
    /// From the test analysis.
    pub test_strategy: DataMap,
    /// From the deployment design.
    pub deployment_architecture: String,
    /// From the deployment design.
    pub operational_requirements: Vec<Value>,
    /// From the documentation synthesis.
    pub documentation_gaps: Vec<Value>,
    /// From the validation findings.
    pub validation_questions: Vec<Value>,

    /// Mean of the validation confidence values, in `[0, 1]`.
    pub confidence_score: f64,
    /// One line per unit that did not complete, as `<phase>/<unit>: <error>`.
    pub gaps: Vec<String>,

    /// Phase 1 results.
    pub analysis: Arc<PhaseResultSet>,
    /// Phase 2 results.
    pub synthesis: Arc<PhaseResultSet>,
    /// Phase 3 results.
    pub validation: Arc<PhaseResultSet>,

    /// Additional metadata.
    #[serde(default)]
    pub metadata: DataMap,
}

impl FinalArtifact {
    /// The artifact's content with identifiers, timestamps and timings
    /// removed.
    #[must_use]
    pub fn content(&self) -> Value {
        let phases: BTreeMap<String, Value> = [&self.analysis, &self.synthesis, &self.validation]
            .into_iter()
            .map(|set| {
                let units: BTreeMap<&str, Value> = set
                    .iter()
                    .map(|r| {
                        (
                            r.unit_name.as_str(),
                            json!({
                                "status": r.status,
                                "error": r.error,
                                "payload": r.payload,
                            }),
                        )
                    })
                    .collect();
                (set.phase.to_string(), json!(units))
            })
            .collect();

        json!({
            "executive_summary": self.executive_summary,
            "system_overview": self.system_overview,
            "architecture_diagram": self.architecture_diagram,
            "component_specifications": self.component_specifications,
            "api_documentation": self.api_documentation,
            "data_flow_diagrams": self.data_flow_diagrams,
            "code_quality_metrics": self.code_quality_metrics,
            "test_strategy": self.test_strategy,
            "deployment_architecture": self.deployment_architecture,
            "operational_requirements": self.operational_requirements,
            "documentation_gaps": self.documentation_gaps,
            "validation_questions": self.validation_questions,
            "confidence_score": self.confidence_score,
            "gaps": self.gaps,
            "phases": phases,
        })
    }

    /// SHA-256 of the canonical JSON of [`content`](Self::content).
    ///
    /// Two runs over the same input with deterministic units share a
    /// fingerprint.
    #[must_use]
    pub fn content_fingerprint(&self) -> String {
        let canonical = to_canonical_json(&self.content());
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}

/// Serializes JSON with object keys sorted at every level.
#[must_use]
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{v}", Value::String(k.clone())))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}
