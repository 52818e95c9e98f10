//! The pipeline request: what to analyze and how to render it.

use crate::core::DataMap;
use crate::errors::ConfigurationError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default workflow name.
pub const DEFAULT_WORKFLOW_NAME: &str = "code-to-design";

fn default_file_patterns() -> Vec<String> {
    ["*.py", "*.java", "*.js", "*.ts", "*.md", "*.json", "*.yaml", "*.yml"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    [
        "**/node_modules/**",
        "**/__pycache__/**",
        "**/.git/**",
        "**/venv/**",
        "**/env/**",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

const fn default_max_file_size_mb() -> u64 {
    10
}

const fn default_depth_level() -> usize {
    10
}

const fn default_true() -> bool {
    true
}

/// Where the repository lives and which files to consider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Local directory or remote URL.
    pub location: String,
    /// Glob patterns of files to include.
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,
    /// Glob patterns of paths to exclude.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    /// Files larger than this are skipped.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    /// Maximum directory depth to descend.
    #[serde(default = "default_depth_level")]
    pub depth_level: usize,
}

impl RepositoryConfig {
    /// Creates a repository config with default patterns and limits.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            file_patterns: default_file_patterns(),
            exclude_patterns: default_exclude_patterns(),
            max_file_size_mb: default_max_file_size_mb(),
            depth_level: default_depth_level(),
        }
    }

    /// Replaces the include patterns.
    #[must_use]
    pub fn with_file_patterns(mut self, patterns: Vec<String>) -> Self {
        self.file_patterns = patterns;
        self
    }

    /// Replaces the exclude patterns.
    #[must_use]
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Returns true if the location looks like a URL (`scheme://...`).
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.location
            .split_once("://")
            .is_some_and(|(scheme, rest)| {
                !scheme.is_empty()
                    && !rest.is_empty()
                    && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+')
            })
    }

    /// Maximum file size in bytes.
    #[must_use]
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Compiles the include patterns.
    pub fn include_set(&self) -> Result<GlobSet, ConfigurationError> {
        build_glob_set(&self.file_patterns)
    }

    /// Compiles the exclude patterns.
    pub fn exclude_set(&self) -> Result<GlobSet, ConfigurationError> {
        build_glob_set(&self.exclude_patterns)
    }

    /// Compiles the exclude patterns as matchers for directories.
    ///
    /// `**/node_modules/**` only matches paths below the directory, so the
    /// trailing `/**` is dropped to match the directory itself.
    pub fn exclude_dir_set(&self) -> Result<GlobSet, ConfigurationError> {
        let patterns: Vec<String> = self
            .exclude_patterns
            .iter()
            .map(|p| p.strip_suffix("/**").unwrap_or(p).to_string())
            .collect();
        build_glob_set(&patterns)
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ConfigurationError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigurationError::invalid_pattern(pattern, e))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ConfigurationError::invalid_pattern(&patterns.join(","), e))
}

/// Which aspects of the code to focus on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Areas of interest.
    #[serde(default = "AnalysisConfig::default_focus_areas")]
    pub focus_areas: Vec<String>,
    /// Include code comments.
    #[serde(default = "default_true")]
    pub include_comments: bool,
    /// Include docstrings.
    #[serde(default = "default_true")]
    pub include_docstrings: bool,
    /// Analyze test files separately.
    #[serde(default = "default_true")]
    pub analyze_test_files: bool,
    /// Produce code quality metrics.
    #[serde(default = "default_true")]
    pub generate_metrics: bool,
}

impl AnalysisConfig {
    fn default_focus_areas() -> Vec<String> {
        ["architecture", "dependencies", "patterns", "quality", "testing"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            focus_areas: Self::default_focus_areas(),
            include_comments: true,
            include_docstrings: true,
            analyze_test_files: true,
            generate_metrics: true,
        }
    }
}

/// Existing documentation to reconcile against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentationConfig {
    /// Folder of existing design documents.
    pub design_docs_path: Option<String>,
    /// Folder of existing requirements documents.
    pub requirements_docs_path: Option<String>,
}

/// Rendering format for the final document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Markdown document.
    #[default]
    Markdown,
    /// Pretty-printed JSON.
    Json,
    /// Minimal HTML document.
    Html,
}

impl OutputFormat {
    /// File extension for the format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
            Self::Html => write!(f, "html"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            other => Err(ConfigurationError::malformed(format!(
                "unknown output format '{other}' (expected markdown, json or html)"
            ))),
        }
    }
}

/// Checks that an execution id is usable as a file name stem.
///
/// Ids key the run documents under the output directory, so only
/// `[A-Za-z0-9_.-]` is accepted and `..` is rejected.
pub fn validate_execution_id(id: &str) -> Result<(), ConfigurationError> {
    if id.trim().is_empty() {
        return Err(ConfigurationError::malformed("execution id must not be empty"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-');
    if id.contains("..") || !id.chars().all(allowed) {
        return Err(ConfigurationError::malformed(format!(
            "execution id '{id}' may only contain letters, digits, '_', '-' and single '.'"
        ))
        .with_context_entry("execution_id", id));
    }
    Ok(())
}

/// Everything a caller supplies to start a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Workflow name.
    #[serde(default = "PipelineRequest::default_workflow_name")]
    pub workflow_name: String,
    /// Caller-supplied execution id; generated when absent.
    #[serde(default)]
    pub execution_id: Option<String>,
    /// Repository to analyze.
    pub repository: RepositoryConfig,
    /// Analysis parameters.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Existing documentation.
    #[serde(default)]
    pub documentation: DocumentationConfig,
    /// Output format.
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Whether to include diagrams.
    #[serde(default = "default_true")]
    pub include_diagrams: bool,
    /// Custom prompts keyed by unit name.
    #[serde(default)]
    pub custom_prompts: BTreeMap<String, String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: DataMap,
}

impl PipelineRequest {
    fn default_workflow_name() -> String {
        DEFAULT_WORKFLOW_NAME.to_string()
    }

    /// Creates a request for a repository with all defaults.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            workflow_name: Self::default_workflow_name(),
            execution_id: None,
            repository: RepositoryConfig::new(location),
            analysis: AnalysisConfig::default(),
            documentation: DocumentationConfig::default(),
            output_format: OutputFormat::default(),
            include_diagrams: true,
            custom_prompts: BTreeMap::new(),
            metadata: DataMap::new(),
        }
    }

    /// Sets the execution id.
    #[must_use]
    pub fn with_execution_id(mut self, id: impl Into<String>) -> Self {
        self.execution_id = Some(id.into());
        self
    }

    /// Replaces the repository config.
    #[must_use]
    pub fn with_repository(mut self, repository: RepositoryConfig) -> Self {
        self.repository = repository;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Sets whether diagrams are included.
    #[must_use]
    pub fn with_diagrams(mut self, include: bool) -> Self {
        self.include_diagrams = include;
        self
    }

    /// Checks the request before any phase runs.
    ///
    /// The location must be a URL or an existing directory, every glob must
    /// compile, and documentation paths (when given) must be directories.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.workflow_name.trim().is_empty() {
            return Err(ConfigurationError::malformed("workflow name must not be empty"));
        }
        if let Some(id) = &self.execution_id {
            validate_execution_id(id)?;
        }

        let location = self.repository.location.trim();
        if location.is_empty() {
            return Err(ConfigurationError::invalid_repository(
                "repository location must not be empty",
            ));
        }
        if !self.repository.is_remote() {
            let path = Path::new(location);
            if !path.exists() {
                return Err(ConfigurationError::invalid_repository(format!(
                    "repository path does not exist: {location}"
                ))
                .with_context_entry("location", location));
            }
            if !path.is_dir() {
                return Err(ConfigurationError::invalid_repository(format!(
                    "repository path is not a directory: {location}"
                ))
                .with_context_entry("location", location));
            }
        }

        self.repository.include_set()?;
        self.repository.exclude_set()?;

        for doc_path in [
            &self.documentation.design_docs_path,
            &self.documentation.requirements_docs_path,
        ]
        .into_iter()
        .flatten()
        {
            if !Path::new(doc_path).is_dir() {
                return Err(ConfigurationError::malformed(format!(
                    "documentation path is not an existing directory: {doc_path}"
                ))
                .with_context_entry("path", doc_path.as_str()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_minimal_json() {
        let request: PipelineRequest =
            serde_json::from_str(r#"{"repository": {"location": "/tmp"}}"#).unwrap();

        assert_eq!(request.workflow_name, "code-to-design");
        assert_eq!(request.repository.file_patterns.len(), 8);
        assert_eq!(request.repository.max_file_size_mb, 10);
        assert!(request.include_diagrams);
        assert_eq!(request.output_format, OutputFormat::Markdown);
    }

    #[test]
    fn test_validate_existing_directory() {
        let dir = TempDir::new().unwrap();
        let request = PipelineRequest::new(dir.path().to_string_lossy());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_directory() {
        let request = PipelineRequest::new("/definitely/not/a/real/path/designflow");
        let err = request.validate().unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::InvalidRepository);
    }

    #[test]
    fn test_validate_file_is_not_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();

        let err = PipelineRequest::new(file.to_string_lossy())
            .validate()
            .unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::InvalidRepository);
    }

    #[test]
    fn test_exclude_dir_set_matches_directories() {
        let repo = RepositoryConfig::new(".");
        let dirs = repo.exclude_dir_set().unwrap();

        assert!(dirs.is_match("node_modules"));
        assert!(dirs.is_match("web/node_modules"));
        assert!(dirs.is_match(".git"));
        assert!(!dirs.is_match("src"));
    }

    #[test]
    fn test_execution_id_must_stay_inside_output_directory() {
        let dir = TempDir::new().unwrap();
        let location = dir.path().to_string_lossy().to_string();

        for bad in ["../escaped", "a/b", "a\\b", "..", "exec id", ""] {
            let err = PipelineRequest::new(location.clone())
                .with_execution_id(bad)
                .validate()
                .unwrap_err();
            assert_eq!(err.kind, ConfigErrorKind::MalformedInput, "id {bad:?}");
        }
        for good in ["exec_20240101_120000", "run-1.v2"] {
            assert!(PipelineRequest::new(location.clone())
                .with_execution_id(good)
                .validate()
                .is_ok());
        }
    }

    #[test]
    fn test_remote_location_skips_path_check() {
        let request = PipelineRequest::new("https://github.com/org/repo");
        assert!(request.repository.is_remote());
        assert!(request.validate().is_ok());
        assert!(!RepositoryConfig::new("./local").is_remote());
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let dir = TempDir::new().unwrap();
        let request = PipelineRequest::new(dir.path().to_string_lossy()).with_repository(
            RepositoryConfig::new(dir.path().to_string_lossy())
                .with_file_patterns(vec!["src/[unclosed".to_string()]),
        );

        let err = request.validate().unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::InvalidPattern);
    }

    #[test]
    fn test_doc_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let mut request = PipelineRequest::new(dir.path().to_string_lossy());
        request.documentation.design_docs_path = Some("/no/such/docs".to_string());

        let err = request.validate().unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::MalformedInput);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("HTML".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("pdf".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.extension(), "json");
    }

    #[test]
    fn test_default_excludes_match_nested_paths() {
        let set = RepositoryConfig::new(".").exclude_set().unwrap();
        assert!(set.is_match("node_modules/pkg/index.js"));
        assert!(set.is_match("a/b/__pycache__/x.pyc"));
        assert!(!set.is_match("src/main.py"));
    }
}
