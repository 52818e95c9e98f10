//! Design skeleton synthesized from whatever phase 1 produced.

use super::names::{DESIGN_ARCHITECT, REPOSITORY_ANALYZER};
use super::Unit;
use crate::context::UnitInput;
use crate::core::{DataMap, DesignArchitecture, UnitPayload, UnitResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Write;

/// Composes a system overview, a text diagram and one component per
/// completed analysis unit. Failed or missing upstream units are skipped.
#[derive(Debug, Clone, Default)]
pub struct DesignSkeletonUnit;

impl DesignSkeletonUnit {
    /// Creates the unit.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn overview(input: &UnitInput, completed: usize, scheduled: usize) -> String {
    let mut text = format!(
        "Design synthesized for '{}' from {completed} of {scheduled} analysis units.",
        input.request().repository.location
    );
    if let Some(repo) = input
        .upstream_payload(REPOSITORY_ANALYZER)
        .and_then(UnitPayload::as_repository_analysis)
    {
        let files = repo.repo_metadata.get("total_files").and_then(Value::as_u64).unwrap_or(0);
        let dirs = repo
            .repo_metadata
            .get("directory_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let _ = write!(text, " The repository holds {files} files in {dirs} directories");
        let languages = string_list(repo.repo_metadata.get("languages"));
        if languages.is_empty() {
            text.push('.');
        } else {
            let _ = write!(text, " ({}).", languages.join(", "));
        }
    }
    text
}

fn diagram(modules: &[String]) -> String {
    let mut out = String::from("[repository]\n");
    if modules.is_empty() {
        out.push_str("  (no modules detected)\n");
    }
    for module in modules {
        let _ = writeln!(out, "  +-- [{module}]");
    }
    out
}

#[async_trait]
impl Unit for DesignSkeletonUnit {
    fn name(&self) -> &str {
        DESIGN_ARCHITECT
    }

    async fn execute(&self, input: &UnitInput) -> UnitResult {
        let Some(analysis) = input.analysis() else {
            return input.fail("design synthesis requires analysis results");
        };

        let components: Vec<Value> = analysis
            .iter()
            .filter(|r| r.is_success())
            .map(|r| {
                json!({
                    "name": r.unit_name,
                    "kind": r.payload.as_ref().map_or("empty", UnitPayload::kind),
                })
            })
            .collect();

        let modules = input
            .upstream_payload(REPOSITORY_ANALYZER)
            .and_then(UnitPayload::as_repository_analysis)
            .map(|repo| string_list(repo.file_structure.get("top_level_directories")))
            .unwrap_or_default();

        let include_diagrams = input.request().include_diagrams;
        let mut api_documentation = DataMap::new();
        api_documentation.insert("modules".into(), json!(modules));

        let design = DesignArchitecture {
            system_overview: overview(input, components.len(), analysis.len()),
            architecture_diagram: if include_diagrams {
                diagram(&modules)
            } else {
                String::new()
            },
            component_specifications: components,
            api_documentation,
            data_flow_diagrams: if include_diagrams {
                vec!["repository -> analysis -> synthesis -> validation -> document".to_string()]
            } else {
                Vec::new()
            },
            design_principles: if modules.len() > 1 {
                vec!["modules separated by top-level directory".to_string()]
            } else {
                Vec::new()
            },
        };

        input.complete(UnitPayload::DesignArchitecture(design))
    }
}
