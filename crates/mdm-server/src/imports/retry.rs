//! Single-record retry
//!
//! Re-runs the import's validate-and-store step for one edited record. A retry
//! is independent of the job the record came from: it never reads or writes
//! the registry. Reconciling the outcome with a held result is the caller's
//! job (see `mdm_common::view::ImportResultView`).

use mdm_common::types::{RawRow, RetryResponse};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::error::RowError;
use super::executor::validate_and_store;
use super::store::RecordStore;
use super::validator::RowValidator;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetryError {
    #[error("Unknown target table '{0}'")]
    UnknownTable(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Persistence(String),
}

impl From<RowError> for RetryError {
    fn from(e: RowError) -> Self {
        if e.is_persistence() {
            RetryError::Persistence(e.to_string())
        } else {
            RetryError::Validation(e.to_string())
        }
    }
}

#[derive(Clone)]
pub struct RetryCoordinator {
    validator: Arc<dyn RowValidator>,
    store: Arc<dyn RecordStore>,
}

impl RetryCoordinator {
    pub fn new(validator: Arc<dyn RowValidator>, store: Arc<dyn RecordStore>) -> Self {
        Self { validator, store }
    }

    #[tracing::instrument(skip(self, record), fields(table = %table))]
    pub async fn retry(&self, table: &str, record: &RawRow) -> Result<RetryResponse, RetryError> {
        if !self.validator.knows_table(table) {
            return Err(RetryError::UnknownTable(table.to_string()));
        }

        match validate_and_store(self.validator.as_ref(), self.store.as_ref(), table, record).await {
            Ok(stored) => {
                info!(key = %stored.key, "Retried record stored");
                Ok(RetryResponse {
                    table_name: table.to_string(),
                    record_key: stored.key,
                    record_id: stored.id,
                })
            }
            Err(e) => {
                warn!(error = %e, "Retried record rejected");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::imports::store::InMemoryRecordStore;
    use crate::imports::validator::SchemaValidator;
    use serde_json::json;

    fn coordinator() -> (Arc<InMemoryRecordStore>, RetryCoordinator) {
        let store = Arc::new(InMemoryRecordStore::new());
        let coordinator =
            RetryCoordinator::new(Arc::new(SchemaValidator::default_catalog()), store.clone());
        (store, coordinator)
    }

    fn record(value: serde_json::Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_retry_stores_fixed_record() {
        let (store, coordinator) = coordinator();
        let response = coordinator
            .retry("items", &record(json!({"sku": "SKU-3", "name": "Pear", "price": "3.25"})))
            .await
            .unwrap();

        assert_eq!(response.record_key, "SKU-3");
        assert_eq!(response.table_name, "items");
        assert_eq!(store.count("items").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_retry_validation_failure() {
        let (store, coordinator) = coordinator();
        let err = coordinator
            .retry("items", &record(json!({"sku": "SKU-3", "name": "Pear", "price": "-1"})))
            .await
            .unwrap_err();

        assert_eq!(err, RetryError::Validation("price: must not be negative".to_string()));
        assert_eq!(store.count("items").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retry_persistence_failure() {
        let (_store, coordinator) = coordinator();
        let row = record(json!({"code": "CASH", "name": "Cash"}));
        coordinator.retry("payment_methods", &row).await.unwrap();

        let err = coordinator.retry("payment_methods", &row).await.unwrap_err();
        assert!(matches!(err, RetryError::Persistence(ref m) if m.starts_with("Could not be saved")));
    }

    #[tokio::test]
    async fn test_retry_unknown_table() {
        let (_store, coordinator) = coordinator();
        let err = coordinator.retry("customers", &RawRow::new()).await.unwrap_err();
        assert_eq!(err, RetryError::UnknownTable("customers".to_string()));
    }
}
