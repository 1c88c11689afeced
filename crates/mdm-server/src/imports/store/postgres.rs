use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::{RecordStore, StoredRecord};
use crate::imports::error::StoreError;
use crate::imports::validator::ValidatedRecord;

/// Records kept as JSONB rows in `master_records`, keyed by `(table_name, record_key)`
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations, then wrap the pool
    pub async fn migrate(pool: PgPool) -> Result<Self, sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    table_name: String,
    record_key: String,
    data: Json<Value>,
    created_at: DateTime<Utc>,
}

impl From<RecordRow> for StoredRecord {
    fn from(row: RecordRow) -> Self {
        let data = match row.data.0 {
            Value::Object(map) => map,
            _ => Default::default(),
        };
        StoredRecord {
            id: row.id,
            table: row.table_name,
            key: row.record_key,
            data,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: &ValidatedRecord) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let result = sqlx::query(
            r#"
            INSERT INTO master_records (id, table_name, record_key, data)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(&record.table)
        .bind(&record.key)
        .bind(Json(Value::Object(record.data.clone())))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Duplicate {
                table: record.table.clone(),
                key: record.key.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn count(&self, table: &str) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM master_records WHERE table_name = $1")
                .bind(table)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }

    async fn list(&self, table: &str, limit: usize) -> Result<Vec<StoredRecord>, StoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            r#"
            SELECT id, table_name, record_key, data, created_at
            FROM master_records
            WHERE table_name = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(table)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredRecord::from).collect())
    }
}
