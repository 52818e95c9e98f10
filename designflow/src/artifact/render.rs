//! Document rendering: markdown, JSON and a minimal HTML page.
//!
//! Markdown and HTML share one section layout; only the final formatting
//! differs. There is no template language.

use super::FinalArtifact;
use crate::context::OutputFormat;
use crate::core::DataMap;
use crate::errors::DesignflowError;
use crate::utils::format_iso;
use serde_json::Value;
use std::fmt::Write;

enum Body {
    Text(String),
    Pre(String),
    List(Vec<String>),
    Table(Vec<[String; 4]>),
}

struct Section {
    title: &'static str,
    body: Body,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn map_lines(map: &DataMap) -> Vec<String> {
    map.iter()
        .map(|(k, v)| format!("{k}: {}", value_text(v)))
        .collect()
}

fn component_line(value: &Value) -> String {
    match value.get("name").and_then(Value::as_str) {
        Some(name) => match value.get("kind").and_then(Value::as_str) {
            Some(kind) => format!("{name} ({kind})"),
            None => name.to_string(),
        },
        None => value_text(value),
    }
}

fn text_or_none(text: &str) -> Body {
    if text.trim().is_empty() {
        Body::Text("None.".to_string())
    } else {
        Body::Text(text.to_string())
    }
}

fn sections(artifact: &FinalArtifact, include_diagrams: bool) -> Vec<Section> {
    let mut out = vec![
        Section {
            title: "Executive Summary",
            body: text_or_none(&artifact.executive_summary),
        },
        Section {
            title: "System Overview",
            body: text_or_none(&artifact.system_overview),
        },
    ];

    if include_diagrams && !artifact.architecture_diagram.trim().is_empty() {
        out.push(Section {
            title: "Architecture",
            body: Body::Pre(artifact.architecture_diagram.trim_end().to_string()),
        });
    }

    out.push(Section {
        title: "Components",
        body: Body::List(artifact.component_specifications.iter().map(component_line).collect()),
    });
    out.push(Section {
        title: "API Documentation",
        body: Body::List(map_lines(&artifact.api_documentation)),
    });

    if include_diagrams && !artifact.data_flow_diagrams.is_empty() {
        out.push(Section {
            title: "Data Flow",
            body: Body::Pre(artifact.data_flow_diagrams.join("\n\n")),
        });
    }

    out.extend([
        Section {
            title: "Code Quality Metrics",
            body: Body::List(map_lines(&artifact.code_quality_metrics)),
        },
        Section {
            title: "Test Strategy",
            body: Body::List(map_lines(&artifact.test_strategy)),
        },
        Section {
            title: "Deployment Architecture",
            body: text_or_none(&artifact.deployment_architecture),
        },
        Section {
            title: "Operational Requirements",
            body: Body::List(artifact.operational_requirements.iter().map(value_text).collect()),
        },
        Section {
            title: "Documentation Gaps",
            body: Body::List(artifact.documentation_gaps.iter().map(value_text).collect()),
        },
        Section {
            title: "Validation Questions",
            body: Body::List(artifact.validation_questions.iter().map(value_text).collect()),
        },
        Section {
            title: "Incomplete Units",
            body: Body::List(artifact.gaps.clone()),
        },
    ]);

    let rows = [&artifact.analysis, &artifact.synthesis, &artifact.validation]
        .into_iter()
        .flat_map(|set| {
            set.iter().map(move |r| {
                [
                    set.phase.to_string(),
                    r.unit_name.clone(),
                    r.status.to_string(),
                    r.elapsed_seconds
                        .map_or_else(|| "-".to_string(), |s| format!("{s:.2}s")),
                ]
            })
        })
        .collect();
    out.push(Section {
        title: "Unit Results",
        body: Body::Table(rows),
    });
    out
}

fn header_lines(artifact: &FinalArtifact) -> [String; 4] {
    [
        format!("Document: {}", artifact.id),
        format!("Execution: {}", artifact.execution_id),
        format!("Generated: {}", format_iso(&artifact.generated_at)),
        format!("Confidence: {:.2}", artifact.confidence_score),
    ]
}

const TABLE_HEADER: [&str; 4] = ["Phase", "Unit", "Status", "Elapsed"];

fn markdown(artifact: &FinalArtifact, include_diagrams: bool) -> String {
    let mut out = String::from("# Design Document\n\n");
    for line in header_lines(artifact) {
        let _ = writeln!(out, "- {line}");
    }

    for section in sections(artifact, include_diagrams) {
        let _ = write!(out, "\n## {}\n\n", section.title);
        match section.body {
            Body::Text(text) => {
                let _ = writeln!(out, "{text}");
            }
            Body::Pre(text) => {
                let _ = writeln!(out, "```text\n{text}\n```");
            }
            Body::List(items) if items.is_empty() => out.push_str("None.\n"),
            Body::List(items) => {
                for item in items {
                    let _ = writeln!(out, "- {item}");
                }
            }
            Body::Table(rows) => {
                let _ = writeln!(out, "| {} |", TABLE_HEADER.join(" | "));
                out.push_str("|---|---|---|---|\n");
                for row in rows {
                    let _ = writeln!(out, "| {} |", row.join(" | "));
                }
            }
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn html(artifact: &FinalArtifact, include_diagrams: bool) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_html(&artifact.id));
    out.push_str("</head>\n<body>\n<h1>Design Document</h1>\n<ul>\n");
    for line in header_lines(artifact) {
        let _ = writeln!(out, "<li>{}</li>", escape_html(&line));
    }
    out.push_str("</ul>\n");

    for section in sections(artifact, include_diagrams) {
        let _ = writeln!(out, "<h2>{}</h2>", escape_html(section.title));
        match section.body {
            Body::Text(text) => {
                let _ = writeln!(out, "<p>{}</p>", escape_html(&text));
            }
            Body::Pre(text) => {
                let _ = writeln!(out, "<pre>{}</pre>", escape_html(&text));
            }
            Body::List(items) if items.is_empty() => out.push_str("<p>None.</p>\n"),
            Body::List(items) => {
                out.push_str("<ul>\n");
                for item in items {
                    let _ = writeln!(out, "<li>{}</li>", escape_html(&item));
                }
                out.push_str("</ul>\n");
            }
            Body::Table(rows) => {
                out.push_str("<table>\n<tr>");
                for head in TABLE_HEADER {
                    let _ = write!(out, "<th>{head}</th>");
                }
                out.push_str("</tr>\n");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        let _ = write!(out, "<td>{}</td>", escape_html(&cell));
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</table>\n");
            }
        }
    }
    out.push_str("</body>\n</html>\n");
    out
}

/// Renders the artifact in the requested format.
///
/// Diagrams are left out of markdown and HTML when `include_diagrams` is
/// false. JSON is the full serialized artifact.
pub fn render(
    artifact: &FinalArtifact,
    format: OutputFormat,
    include_diagrams: bool,
) -> Result<String, DesignflowError> {
    match format {
        OutputFormat::Markdown => Ok(markdown(artifact, include_diagrams)),
        OutputFormat::Html => Ok(html(artifact, include_diagrams)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(artifact)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::aggregate;
    use crate::core::{DesignArchitecture, Phase, PhaseResultSet, UnitPayload, UnitResult};
    use chrono::Utc;
    use std::sync::Arc;

    fn artifact() -> FinalArtifact {
        let mut analysis = PhaseResultSet::new(Phase::Analysis);
        analysis.insert(UnitResult::failed("test_analyst", "e", "not implemented"));
        let mut synthesis = PhaseResultSet::new(Phase::Synthesis);
        synthesis.insert(UnitResult::completed(
            "design_architect",
            "e",
            UnitPayload::DesignArchitecture(DesignArchitecture {
                system_overview: "Uses <script> & friends".into(),
                architecture_diagram: "[repository]\n  +-- [src]\n".into(),
                component_specifications: vec![serde_json::json!({"name": "repository_analyzer", "kind": "repository_analysis"})],
                ..Default::default()
            }),
        ));
        aggregate(
            "exec_r",
            Arc::new(analysis),
            Arc::new(synthesis),
            Arc::new(PhaseResultSet::new(Phase::Validation)),
            Utc::now(),
        )
    }

    #[test]
    fn test_markdown_sections() {
        let doc = render(&artifact(), OutputFormat::Markdown, true).unwrap();

        assert!(doc.starts_with("# Design Document\n"));
        assert!(doc.contains("## Architecture\n\n```text\n[repository]\n  +-- [src]\n```"));
        assert!(doc.contains("- repository_analyzer (repository_analysis)"));
        assert!(doc.contains("- analysis/test_analyst: not implemented"));
        assert!(doc.contains("| analysis | test_analyst | failed | - |"));
        assert!(doc.contains("## Validation Questions\n\nNone.\n"));
    }

    #[test]
    fn test_markdown_without_diagrams() {
        let doc = render(&artifact(), OutputFormat::Markdown, false).unwrap();
        assert!(!doc.contains("## Architecture"));
    }

    #[test]
    fn test_html_is_escaped() {
        let doc = render(&artifact(), OutputFormat::Html, true).unwrap();

        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<p>Uses &lt;script&gt; &amp; friends</p>"));
        assert!(!doc.contains("<script>"));
    }

    #[test]
    fn test_json_round_trips() {
        let original = artifact();
        let doc = render(&original, OutputFormat::Json, true).unwrap();
        let parsed: FinalArtifact = serde_json::from_str(&doc).unwrap();
        assert_eq!(parsed, original);
    }
}
