//! Retry record command
//!
//! Re-imports one edited record into its target table. The job the record
//! originally failed in is not touched.

use mediator::Request;
use mdm_common::types::{RawRow, RetryResponse};
use serde::{Deserialize, Serialize};

use crate::imports::{ImportService, RetryError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryRecordCommand {
    pub table: String,
    pub record: RawRow,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryRecordError {
    #[error("Record has no fields")]
    EmptyRecord,

    #[error(transparent)]
    Retry(#[from] RetryError),
}

impl Request<Result<RetryResponse, RetryRecordError>> for RetryRecordCommand {}

#[tracing::instrument(skip(service, command), fields(table = %command.table))]
pub async fn handle(
    service: ImportService,
    command: RetryRecordCommand,
) -> Result<RetryResponse, RetryRecordError> {
    if command.record.is_empty() {
        return Err(RetryRecordError::EmptyRecord);
    }
    Ok(service.retry().retry(&command.table, &command.record).await?)
}
