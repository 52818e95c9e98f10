//! On-disk persistence of runs under the output directory.
//!
//! Layout:
//!
//! ```text
//! <root>/<execution_id>.json                    status + artifact of the run
//! <root>/phases/<execution_id>_<phase>.json     one file per phase (optional)
//! <root>/<artifact_id>.<md|json|html>           rendered document
//! ```

use crate::context::{validate_execution_id, OutputFormat};
use crate::core::Phase;
use crate::errors::DesignflowError;
use crate::pipeline::PipelineOutcome;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes run documents keyed by execution id.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `root`. Nothing is created until a write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The output directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the run document.
    #[must_use]
    pub fn run_path(&self, execution_id: &str) -> PathBuf {
        self.root.join(format!("{execution_id}.json"))
    }

    /// Path of one phase's intermediate document.
    #[must_use]
    pub fn phase_path(&self, execution_id: &str, phase: Phase) -> PathBuf {
        self.root
            .join("phases")
            .join(format!("{execution_id}_{phase}.json"))
    }

    /// Path of a rendered document.
    #[must_use]
    pub fn document_path(&self, artifact_id: &str, format: OutputFormat) -> PathBuf {
        self.root
            .join(format!("{artifact_id}.{}", format.extension()))
    }

    async fn write_json(path: &Path, value: &impl Serialize) -> Result<(), DesignflowError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(path, bytes).await?;
        debug!(path = %path.display(), "wrote json document");
        Ok(())
    }

    /// Writes the run document and, when `intermediate` is set, one file per
    /// phase that ran. Returns the written paths.
    ///
    /// An execution id that is not a plain file name stem is rejected before
    /// anything is written.
    pub async fn save_outcome(
        &self,
        outcome: &PipelineOutcome,
        intermediate: bool,
    ) -> Result<Vec<PathBuf>, DesignflowError> {
        validate_execution_id(&outcome.execution_id)?;
        let mut written = Vec::new();

        let run_path = self.run_path(&outcome.execution_id);
        let document = json!({
            "status": outcome.status_object(),
            "workflow_name": outcome.workflow_name,
            "started_at": outcome.started_at,
            "completed_at": outcome.completed_at,
            "artifact": outcome.artifact,
        });
        Self::write_json(&run_path, &document).await?;
        written.push(run_path);

        if intermediate {
            for phase in Phase::ALL {
                if let Some(set) = outcome.phase(phase) {
                    let path = self.phase_path(&outcome.execution_id, phase);
                    Self::write_json(&path, set).await?;
                    written.push(path);
                }
            }
        }
        Ok(written)
    }

    /// Writes a rendered document.
    pub async fn save_document(
        &self,
        artifact_id: &str,
        format: OutputFormat,
        contents: &str,
    ) -> Result<PathBuf, DesignflowError> {
        let path = self.document_path(artifact_id, format);
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }

    /// Reads a run document back.
    pub async fn load_run(&self, execution_id: &str) -> Result<Value, DesignflowError> {
        validate_execution_id(execution_id)?;
        let bytes = tokio::fs::read(self.run_path(execution_id)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::aggregate;
    use crate::core::{PhaseResultSet, RunStatus, UnitResult};
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn outcome() -> PipelineOutcome {
        let mut analysis = PhaseResultSet::new(Phase::Analysis);
        analysis.insert(UnitResult::completed_empty("a", "exec_store"));
        let analysis = Arc::new(analysis);
        let synthesis = Arc::new(PhaseResultSet::new(Phase::Synthesis));
        let validation = Arc::new(PhaseResultSet::new(Phase::Validation));
        let artifact = aggregate(
            "exec_store",
            analysis.clone(),
            synthesis.clone(),
            validation.clone(),
            Utc::now(),
        );
        PipelineOutcome {
            status: RunStatus::Completed,
            workflow_name: "code-to-design".into(),
            execution_id: "exec_store".into(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            total_elapsed_seconds: 0.2,
            analysis: Some(analysis),
            synthesis: Some(synthesis),
            validation: Some(validation),
            artifact: Some(artifact),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_save_outcome_with_phases() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("out"));

        let written = store.save_outcome(&outcome(), true).await.unwrap();

        assert_eq!(written.len(), 4);
        assert!(store.phase_path("exec_store", Phase::Synthesis).exists());
        let run = store.load_run("exec_store").await.unwrap();
        assert_eq!(run["status"]["status"], json!("completed"));
        assert_eq!(run["artifact"]["analysis"]["results"]["a"]["status"], json!("completed"));
    }

    #[tokio::test]
    async fn test_save_outcome_without_phases() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let written = store.save_outcome(&outcome(), false).await.unwrap();
        assert_eq!(written, vec![dir.path().join("exec_store.json")]);
        assert!(!dir.path().join("phases").exists());
    }

    #[tokio::test]
    async fn test_save_outcome_rejects_escaping_execution_id() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("out"));
        let mut escaping = outcome();
        escaping.execution_id = "../escaped".into();

        let err = store.save_outcome(&escaping, true).await.unwrap_err();

        assert!(matches!(err, DesignflowError::Configuration(_)));
        assert!(err.to_string().contains("CONFIG-MALFORMED-INPUT"));
        assert!(!dir.path().join("escaped.json").exists());
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_save_document() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let path = store
            .save_document("design_doc_x", OutputFormat::Html, "<html></html>")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("design_doc_x.html"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<html></html>");
    }
}
