//! Read-only progress queries
//!
//! Pollers either ask for the current snapshots or long-poll: pass the
//! revision from the previous answer and wait until the registry moves past it.

use mdm_common::types::{ImportResult, JobSnapshot};
use std::time::Duration;
use uuid::Uuid;

use super::error::ImportError;
use super::registry::{JobFilter, JobRegistry};

#[derive(Clone)]
pub struct ProgressReporter {
    registry: JobRegistry,
}

impl ProgressReporter {
    pub fn new(registry: JobRegistry) -> Self {
        Self { registry }
    }

    pub async fn poll(&self, filter: &JobFilter) -> Vec<JobSnapshot> {
        self.registry.list(filter).await
    }

    /// Snapshots together with the revision they reflect
    pub async fn poll_with_revision(&self, filter: &JobFilter) -> (u64, Vec<JobSnapshot>) {
        self.registry.snapshots(filter).await
    }

    pub async fn snapshot(&self, job_id: Uuid) -> Result<JobSnapshot, ImportError> {
        self.registry.get(job_id).await
    }

    pub async fn result(&self, job_id: Uuid) -> Result<ImportResult, ImportError> {
        self.registry.view(job_id, |job| job.result()).await?
    }

    /// Wait until the registry revision differs from `since`, or `timeout` passes.
    /// Returns the revision observed last.
    pub async fn wait_for_change(&self, since: u64, timeout: Duration) -> u64 {
        let mut rx = self.registry.subscribe();
        let changed = rx.wait_for(|rev| *rev != since);
        let rev = match tokio::time::timeout(timeout, changed).await {
            Ok(Ok(rev)) => *rev,
            _ => self.registry.revision(),
        };
        rev
    }
}
