//! List records query
//!
//! Most recently stored records of one target table, with the table's total.

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::imports::{ImportService, StoreError, StoredRecord};

pub const DEFAULT_RECORD_LIMIT: usize = 50;
pub const MAX_RECORD_LIMIT: usize = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRecordsQuery {
    #[serde(default)]
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordListResponse {
    pub table_name: String,
    pub total: u64,
    pub records: Vec<StoredRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListRecordsError {
    #[error("Unknown target table '{0}'")]
    UnknownTable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Request<Result<RecordListResponse, ListRecordsError>> for ListRecordsQuery {}

pub async fn handle(
    service: ImportService,
    query: ListRecordsQuery,
) -> Result<RecordListResponse, ListRecordsError> {
    let table = query.table.trim();
    if !service.validator().knows_table(table) {
        return Err(ListRecordsError::UnknownTable(table.to_string()));
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECORD_LIMIT)
        .min(MAX_RECORD_LIMIT);

    let store = service.store();
    let total = store.count(table).await?;
    let records = store.list(table, limit).await?;

    Ok(RecordListResponse {
        table_name: table.to_string(),
        total,
        records,
    })
}
