//! Process-wide registry of import jobs
//!
//! The registry is the single owner of job state. Workers mutate jobs through
//! [`JobRegistry::mutate`]; everyone else reads cloned snapshots. Every
//! committed mutation bumps a revision counter published on a watch channel,
//! which lets pollers block until something actually changed.

use chrono::Utc;
use mdm_common::types::{JobSnapshot, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::ImportError;
use super::job::ImportJob;

/// Narrows a listing to jobs with a given status and/or target table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub table: Option<String>,
}

impl JobFilter {
    pub fn matches(&self, job: &ImportJob) -> bool {
        if let Some(status) = self.status {
            if job.status() != status {
                return false;
            }
        }
        if let Some(ref table) = self.table {
            if job.table_name() != table {
                return false;
            }
        }
        true
    }
}

#[derive(Clone)]
pub struct JobRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    jobs: RwLock<HashMap<Uuid, ImportJob>>,
    revision: watch::Sender<u64>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                jobs: RwLock::new(HashMap::new()),
                revision,
            }),
        }
    }

    /// Register a new job in `uploading` and return its id
    pub async fn create(&self, table_name: &str) -> Uuid {
        let job = ImportJob::new(table_name);
        let job_id = job.job_id();

        let mut jobs = self.inner.jobs.write().await;
        jobs.insert(job_id, job);
        self.bump();
        drop(jobs);

        debug!(%job_id, table = table_name, "Registered import job");
        job_id
    }

    pub async fn get(&self, job_id: Uuid) -> Result<JobSnapshot, ImportError> {
        self.view(job_id, ImportJob::snapshot).await
    }

    /// Run a read-only projection of one job under the read lock
    pub async fn view<T>(
        &self,
        job_id: Uuid,
        f: impl FnOnce(&ImportJob) -> T,
    ) -> Result<T, ImportError> {
        let jobs = self.inner.jobs.read().await;
        jobs.get(&job_id)
            .map(f)
            .ok_or(ImportError::JobNotFound(job_id))
    }

    /// Snapshots of matching jobs, oldest first
    pub async fn list(&self, filter: &JobFilter) -> Vec<JobSnapshot> {
        self.snapshots(filter).await.1
    }

    /// Snapshots of matching jobs together with the revision they were taken at
    pub async fn snapshots(&self, filter: &JobFilter) -> (u64, Vec<JobSnapshot>) {
        let jobs = self.inner.jobs.read().await;
        let revision = *self.inner.revision.borrow();

        let mut snapshots: Vec<JobSnapshot> = jobs
            .values()
            .filter(|job| filter.matches(job))
            .map(ImportJob::snapshot)
            .collect();
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.job_id.cmp(&b.job_id)));

        (revision, snapshots)
    }

    /// Apply `f` to one job atomically with respect to every reader.
    ///
    /// The revision only moves when `f` succeeds.
    pub async fn mutate<T>(
        &self,
        job_id: Uuid,
        f: impl FnOnce(&mut ImportJob) -> Result<T, ImportError>,
    ) -> Result<T, ImportError> {
        let mut jobs = self.inner.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or(ImportError::JobNotFound(job_id))?;
        let value = f(job)?;
        self.bump();
        Ok(value)
    }

    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    /// Receiver that observes every revision bump
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub async fn len(&self) -> usize {
        self.inner.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop terminal jobs that finished more than `retention` ago. Returns how many were removed.
    pub async fn prune_finished(&self, retention: chrono::Duration) -> usize {
        let cutoff = Utc::now() - retention;

        let mut jobs = self.inner.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| match job.finished_at() {
            Some(finished_at) if job.is_complete() => finished_at > cutoff,
            _ => true,
        });
        let removed = before - jobs.len();
        if removed > 0 {
            self.bump();
        }
        removed
    }

    /// Periodically prune finished jobs older than `retention`
    pub fn spawn_retention_sweeper(&self, retention: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        let retention_chrono =
            chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let period = (retention / 2).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = registry.prune_finished(retention_chrono).await;
                if removed > 0 {
                    info!(removed, "Pruned finished import jobs");
                }
            }
        })
    }

    // Callers hold the write lock, so revision order matches commit order.
    fn bump(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }
}
