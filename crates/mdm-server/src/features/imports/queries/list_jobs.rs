//! List jobs query
//!
//! Plain poll: returns every matching job snapshot and the registry revision
//! they were taken at.
//!
//! Long-poll: pass the previous `revision` as `since` (and optionally
//! `wait_ms`). The request is held until some job changes or the wait runs
//! out, whichever comes first.

use mdm_common::types::{JobListResponse, JobStatus};
use mediator::Request;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::imports::{ImportService, JobFilter};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Revision from a previous answer; enables long-polling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_ms: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListJobsError {
    #[error("Invalid status filter '{0}'")]
    InvalidStatus(String),
}

impl Request<Result<JobListResponse, ListJobsError>> for ListJobsQuery {}

impl ListJobsQuery {
    fn filter(&self) -> Result<JobFilter, ListJobsError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(
                s.parse::<JobStatus>()
                    .map_err(|_| ListJobsError::InvalidStatus(s.to_string()))?,
            ),
        };
        let table = self
            .table
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Ok(JobFilter { status, table })
    }
}

#[tracing::instrument(skip(service, query), fields(since = ?query.since, wait_ms = ?query.wait_ms))]
pub async fn handle(
    service: ImportService,
    long_poll_max: Duration,
    query: ListJobsQuery,
) -> Result<JobListResponse, ListJobsError> {
    let filter = query.filter()?;
    let reporter = service.reporter();

    if let Some(since) = query.since {
        let wait = query
            .wait_ms
            .map(Duration::from_millis)
            .unwrap_or(long_poll_max)
            .min(long_poll_max);
        reporter.wait_for_change(since, wait).await;
    }

    let (revision, jobs) = reporter.poll_with_revision(&filter).await;
    Ok(JobListResponse { revision, jobs })
}
