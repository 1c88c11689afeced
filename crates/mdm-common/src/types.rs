//! Wire types shared by the import server and its callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MdmError;

/// One parsed row: field name to raw value, before validation.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// Import job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploading => "uploading",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// `completed` and `failed` are terminal and sticky.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = MdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uploading" => Ok(JobStatus::Uploading),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(MdmError::InvalidStatus(other.to_string())),
        }
    }
}

/// A source row that failed validation or persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRecord {
    /// 0-based position of the row in the source file
    pub original_index: u64,
    /// Field values as parsed, editable by the caller before a retry
    pub record: RawRow,
    /// Why the row was rejected
    pub error: String,
}

impl FailedRecord {
    /// Error line for summaries, numbering rows from 1 like a spreadsheet does
    pub fn summary_line(&self) -> String {
        format!("Row {}: {}", self.original_index + 1, self.error)
    }
}

/// Point-in-time copy of a job's observable fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub status: JobStatus,
    pub stage: String,
    pub current: u64,
    /// 0 while the row count is unknown
    pub total: u64,
    pub success_count: u64,
    pub failed_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput_rps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<f64>,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    /// Percentage of rows attempted, `None` while the total is unknown
    pub fn percent_complete(&self) -> Option<f64> {
        if self.total == 0 {
            return if self.is_complete { Some(100.0) } else { None };
        }
        Some(self.current as f64 / self.total as f64 * 100.0)
    }
}

/// Terminal outcome of an import, as handed to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: u64,
    pub failed: u64,
    pub errors: Vec<String>,
    pub failed_records: Vec<FailedRecord>,
}

impl ImportResult {
    pub fn from_parts(success: u64, failed_records: Vec<FailedRecord>) -> Self {
        Self {
            success,
            failed: failed_records.len() as u64,
            errors: failed_records.iter().map(FailedRecord::summary_line).collect(),
            failed_records,
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.failed
    }
}

/// Response to an accepted upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitImportResponse {
    pub job_id: Uuid,
    pub table_name: String,
    pub status: JobStatus,
}

/// Response to a poll of all jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    /// Registry revision the snapshots were taken at; pass back as `since` to long-poll
    pub revision: u64,
    pub jobs: Vec<JobSnapshot>,
}

/// Request body for retrying one edited record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryRequest {
    pub record: RawRow,
}

/// A retried record that validated and was stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryResponse {
    pub table_name: String,
    pub record_key: String,
    pub record_id: Uuid,
}

/// Description of one field of a target table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub kind: String,
    pub required: bool,
}

/// Description of an importable target table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub key_field: String,
    pub fields: Vec<FieldInfo>,
}
