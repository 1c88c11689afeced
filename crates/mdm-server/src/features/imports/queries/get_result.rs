//! Get import result query
//!
//! Only finished jobs have a result. A failed job's result carries its
//! pipeline error as the first entry of `errors`.

use mediator::Request;
use mdm_common::types::ImportResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::imports::{ImportError, ImportService};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetImportResultQuery {
    pub job_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetImportResultError {
    #[error("Import job not found: {0}")]
    NotFound(Uuid),

    #[error("Import job {0} is still running")]
    NotTerminal(Uuid),

    #[error(transparent)]
    Job(ImportError),
}

impl From<ImportError> for GetImportResultError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::JobNotFound(id) => Self::NotFound(id),
            ImportError::NotTerminal(id) => Self::NotTerminal(id),
            other => Self::Job(other),
        }
    }
}

impl Request<Result<ImportResult, GetImportResultError>> for GetImportResultQuery {}

pub async fn handle(
    service: ImportService,
    query: GetImportResultQuery,
) -> Result<ImportResult, GetImportResultError> {
    Ok(service.reporter().result(query.job_id).await?)
}
