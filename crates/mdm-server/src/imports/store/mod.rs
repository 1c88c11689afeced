//! Persistence of validated records
//!
//! Writes are committed one row at a time and never rolled back; an import
//! that fails halfway leaves the rows it already stored in place.

mod memory;
mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PgRecordStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::StoreError;
use super::validator::ValidatedRecord;

/// A record as stored in its target table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub id: Uuid,
    pub table: String,
    pub key: String,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store one record. Keys are unique per table.
    async fn insert(&self, record: &ValidatedRecord) -> Result<Uuid, StoreError>;

    async fn count(&self, table: &str) -> Result<u64, StoreError>;

    /// Most recently stored first
    async fn list(&self, table: &str, limit: usize) -> Result<Vec<StoredRecord>, StoreError>;
}
