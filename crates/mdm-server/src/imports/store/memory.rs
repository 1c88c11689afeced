use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RecordStore, StoredRecord};
use crate::imports::error::StoreError;
use crate::imports::validator::ValidatedRecord;

/// Process-local store, used when no database is configured and in tests
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    records: HashMap<String, Vec<StoredRecord>>,
    keys: HashMap<String, HashSet<String>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, record: &ValidatedRecord) -> Result<Uuid, StoreError> {
        let mut tables = self.inner.write().await;

        let keys = tables.keys.entry(record.table.clone()).or_default();
        if !keys.insert(record.key.clone()) {
            return Err(StoreError::Duplicate {
                table: record.table.clone(),
                key: record.key.clone(),
            });
        }

        let id = Uuid::new_v4();
        tables
            .records
            .entry(record.table.clone())
            .or_default()
            .push(StoredRecord {
                id,
                table: record.table.clone(),
                key: record.key.clone(),
                data: record.data.clone(),
                created_at: Utc::now(),
            });
        Ok(id)
    }

    async fn count(&self, table: &str) -> Result<u64, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.records.get(table).map_or(0, |r| r.len() as u64))
    }

    async fn list(&self, table: &str, limit: usize) -> Result<Vec<StoredRecord>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables
            .records
            .get(table)
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
