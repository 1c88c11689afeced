//! Error taxonomy for the import pipeline
//!
//! - [`ImportError`]: job bookkeeping errors (unknown job, illegal transition).
//! - [`RowError`]: one row was rejected; recorded on the job, never aborts it.
//! - [`ParseError`]: the upload could not be read; fails the whole job.
//! - [`StoreError`]: the record store refused or failed a write.

use mdm_common::types::JobStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("Import job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Import job {job_id} is {status}; cannot {action}")]
    InvalidTransition {
        job_id: Uuid,
        status: JobStatus,
        action: &'static str,
    },

    #[error("Import job {job_id} has already attempted all {total} rows")]
    ProgressOverflow { job_id: Uuid, total: u64 },

    #[error("Import job {job_id} expected row {expected} but got row {actual}")]
    OutOfOrder {
        job_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("Import job {0} is still running")]
    NotTerminal(Uuid),
}

/// Why a single row was not imported
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("{field}: {message}")]
    Field { field: String, message: String },

    #[error("{0}")]
    Invalid(String),

    #[error("Could not be saved: {0}")]
    Persistence(String),
}

impl RowError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, RowError::Persistence(_))
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("File is not valid UTF-8 text (invalid byte at offset {0})")]
    Encoding(usize),

    #[error("CSV header row is missing or empty")]
    MissingHeader,

    #[error("CSV header '{0}' appears more than once")]
    DuplicateHeader(String),

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Entry {0} is not a JSON object")]
    NotAnObject(usize),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A {table} record with key '{key}' already exists")]
    Duplicate { table: String, key: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
