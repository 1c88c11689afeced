//! Get job query

use mediator::Request;
use mdm_common::types::JobSnapshot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::imports::{ImportError, ImportService};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobQuery {
    pub job_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Import job not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Job(ImportError),
}

impl From<ImportError> for GetJobError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::JobNotFound(id) => Self::NotFound(id),
            other => Self::Job(other),
        }
    }
}

impl Request<Result<JobSnapshot, GetJobError>> for GetJobQuery {}

pub async fn handle(service: ImportService, query: GetJobQuery) -> Result<JobSnapshot, GetJobError> {
    Ok(service.reporter().snapshot(query.job_id).await?)
}
