//! Local copies of import results
//!
//! `mdm result` stores the fetched result as an [`ImportResultView`] under the
//! state directory, one JSON file per job. `mdm retry` edits and reconciles
//! that copy; the job on the server is never changed by a retry.

use crate::error::{CliError, Result};
use mdm_common::view::ImportResultView;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, job_id: Uuid) -> PathBuf {
        self.dir.join("results").join(format!("{}.json", job_id))
    }

    pub fn load(&self, job_id: Uuid) -> Result<Option<ImportResultView>> {
        let path = self.path_for(job_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Load a stored view, failing when `mdm result` has not been run yet
    pub fn require(&self, job_id: Uuid) -> Result<ImportResultView> {
        self.load(job_id)?.ok_or(CliError::NoStoredResult(job_id))
    }

    pub fn save(&self, view: &ImportResultView) -> Result<PathBuf> {
        let path = self.path_for(view.job_id());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write then rename so an interrupted save never leaves half a file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(view)?)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(path = %path.display(), "Saved import result");
        Ok(path)
    }
}
