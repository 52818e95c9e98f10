//! Repository inventory: a structural census of the files on disk.

use super::names::REPOSITORY_ANALYZER;
use super::Unit;
use crate::context::{RepositoryConfig, UnitInput};
use crate::core::{DataMap, RepositoryAnalysis, UnitPayload, UnitResult};
use crate::errors::UnitFault;
use anyhow::Context;
use async_trait::async_trait;
use globset::GlobSet;
use ignore::WalkBuilder;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Walks a local repository and reports counts by extension, sizes and layout.
#[derive(Debug, Clone, Default)]
pub struct RepositoryInventoryUnit;

impl RepositoryInventoryUnit {
    /// Creates the unit.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Default)]
struct Census {
    files_by_extension: BTreeMap<String, u64>,
    total_files: u64,
    total_bytes: u64,
    directory_count: u64,
    skipped_large_files: u64,
    top_level_dirs: BTreeSet<String>,
}

struct WalkRules {
    include: GlobSet,
    exclude: GlobSet,
    exclude_dirs: GlobSet,
    max_depth: usize,
    max_bytes: u64,
}

impl WalkRules {
    fn from_config(repo: &RepositoryConfig) -> anyhow::Result<Self> {
        Ok(Self {
            include: repo.include_set()?,
            exclude: repo.exclude_set()?,
            exclude_dirs: repo.exclude_dir_set()?,
            max_depth: repo.depth_level,
            max_bytes: repo.max_file_size_bytes(),
        })
    }
}

/// Walks `root` synchronously; `depth_level` counts directory levels below
/// the root, so files one level deeper than the last walked directory count.
fn walk(root: &Path, rules: &WalkRules) -> anyhow::Result<Census> {
    std::fs::read_dir(root).with_context(|| format!("listing {}", root.display()))?;

    let prune_root = root.to_path_buf();
    let exclude_dirs = rules.exclude_dirs.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .max_depth(Some(rules.max_depth.saturating_add(1)))
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir
                && entry
                    .path()
                    .strip_prefix(&prune_root)
                    .is_ok_and(|rel| exclude_dirs.is_match(rel)))
        })
        .build();

    let mut census = Census::default();
    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if entry.depth() == 0 {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if entry.depth() > rules.max_depth {
                continue;
            }
            census.directory_count += 1;
            if entry.depth() == 1 {
                census.top_level_dirs.insert(rel.to_string_lossy().into_owned());
            }
        } else if file_type.is_file() {
            if rules.exclude.is_match(rel) || !rules.include.is_match(rel) {
                continue;
            }
            let len = entry
                .metadata()
                .with_context(|| format!("reading metadata of {}", entry.path().display()))?
                .len();
            if len > rules.max_bytes {
                census.skipped_large_files += 1;
                continue;
            }
            let extension = entry
                .path()
                .extension()
                .map_or_else(|| "(none)".to_string(), |e| e.to_string_lossy().to_lowercase());
            *census.files_by_extension.entry(extension).or_default() += 1;
            census.total_files += 1;
            census.total_bytes += len;
        }
    }
    Ok(census)
}

fn language_for(extension: &str) -> Option<&'static str> {
    match extension {
        "py" => Some("python"),
        "java" => Some("java"),
        "js" => Some("javascript"),
        "ts" => Some("typescript"),
        "rs" => Some("rust"),
        "go" => Some("go"),
        _ => None,
    }
}

async fn take_census(repo: &RepositoryConfig) -> anyhow::Result<Census> {
    let rules = WalkRules::from_config(repo)?;
    let root = PathBuf::from(&repo.location);
    tokio::task::spawn_blocking(move || walk(&root, &rules))
        .await
        .context("inventory walk did not finish")?
}

fn to_payload(repo: &RepositoryConfig, census: Census) -> UnitPayload {
    let languages: BTreeSet<&str> = census
        .files_by_extension
        .keys()
        .filter_map(|ext| language_for(ext))
        .collect();

    let mut repo_metadata = DataMap::new();
    repo_metadata.insert("location".into(), json!(repo.location));
    repo_metadata.insert("total_files".into(), json!(census.total_files));
    repo_metadata.insert("total_bytes".into(), json!(census.total_bytes));
    repo_metadata.insert("directory_count".into(), json!(census.directory_count));
    repo_metadata.insert("skipped_large_files".into(), json!(census.skipped_large_files));
    repo_metadata.insert("languages".into(), json!(languages));

    let mut file_structure = DataMap::new();
    file_structure.insert("files_by_extension".into(), json!(census.files_by_extension));
    file_structure.insert("top_level_directories".into(), json!(census.top_level_dirs));

    let mut code_quality_metrics = DataMap::new();
    let average = if census.total_files == 0 {
        0
    } else {
        census.total_bytes / census.total_files
    };
    code_quality_metrics.insert("files_analyzed".into(), json!(census.total_files));
    code_quality_metrics.insert("average_file_bytes".into(), json!(average));

    UnitPayload::RepositoryAnalysis(RepositoryAnalysis {
        repo_metadata,
        code_quality_metrics,
        file_structure,
        ..Default::default()
    })
}

#[async_trait]
impl Unit for RepositoryInventoryUnit {
    fn name(&self) -> &str {
        REPOSITORY_ANALYZER
    }

    async fn execute(&self, input: &UnitInput) -> UnitResult {
        let repo = &input.request().repository;
        if repo.is_remote() {
            return input.fail("remote repositories are not supported by the inventory unit");
        }
        match take_census(repo).await {
            Ok(census) => input.complete(to_payload(repo, census)),
            Err(err) => input.fault(&UnitFault::from(err)),
        }
    }
}
