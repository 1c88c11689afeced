//! List tables query

use mediator::Request;
use mdm_common::types::TableInfo;
use serde::{Deserialize, Serialize};

use crate::imports::ImportService;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTablesQuery {}

impl Request<Vec<TableInfo>> for ListTablesQuery {}

pub async fn handle(service: ImportService, _query: ListTablesQuery) -> Vec<TableInfo> {
    service.validator().tables()
}
