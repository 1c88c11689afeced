//! Import job state
//!
//! `uploading -> processing -> {completed, failed}`, plus `uploading -> failed`
//! when the upload never becomes processable. Terminal states are sticky.
//!
//! Every mutating method checks its preconditions before it writes, so an
//! `Err` always leaves the job exactly as it was.

use chrono::{DateTime, Utc};
use mdm_common::types::{FailedRecord, ImportResult, JobSnapshot, JobStatus};
use std::time::Duration;
use uuid::Uuid;

use super::error::ImportError;

pub const STAGE_RECEIVING: &str = "receiving upload";
pub const STAGE_PARSING: &str = "parsing";

#[derive(Debug, Clone, PartialEq)]
pub struct ImportJob {
    job_id: Uuid,
    table_name: String,
    file_name: Option<String>,
    status: JobStatus,
    stage: String,
    current: u64,
    total: u64,
    total_known: bool,
    success_count: u64,
    failed_records: Vec<FailedRecord>,
    error: Option<String>,
    throughput_rps: Option<f64>,
    eta_secs: Option<f64>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            table_name: table_name.into(),
            file_name: None,
            status: JobStatus::Uploading,
            stage: STAGE_RECEIVING.to_string(),
            current: 0,
            total: 0,
            total_known: false,
            success_count: 0,
            failed_records: Vec::new(),
            error: None,
            throughput_rps: None,
            eta_secs: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    /// 0 until the row count is known
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn failed_records(&self) -> &[FailedRecord] {
        &self.failed_records
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Record the uploaded file's name while the upload is still arriving
    pub fn set_file_name(&mut self, file_name: impl Into<String>) -> Result<(), ImportError> {
        self.require(JobStatus::Uploading, "name the upload")?;
        self.file_name = Some(file_name.into());
        Ok(())
    }

    pub fn begin_processing(&mut self) -> Result<(), ImportError> {
        self.require(JobStatus::Uploading, "begin processing")?;
        self.status = JobStatus::Processing;
        self.stage = STAGE_PARSING.to_string();
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn set_stage(&mut self, stage: impl Into<String>) -> Result<(), ImportError> {
        if self.status.is_terminal() {
            return Err(self.transition_error("change stage"));
        }
        self.stage = stage.into();
        Ok(())
    }

    /// Fix the row count. Only once, and never below what was already attempted.
    pub fn set_total(&mut self, total: u64) -> Result<(), ImportError> {
        self.require(JobStatus::Processing, "set the row count")?;
        if self.total_known && self.total != total {
            return Err(self.transition_error("change a known row count"));
        }
        if total < self.current {
            return Err(ImportError::ProgressOverflow {
                job_id: self.job_id,
                total,
            });
        }
        self.total = total;
        self.total_known = true;
        Ok(())
    }

    pub fn record_success(&mut self) -> Result<(), ImportError> {
        self.check_can_attempt()?;
        self.success_count += 1;
        self.current += 1;
        Ok(())
    }

    /// Append a failed row. Rows arrive in source order, so the failed row must be
    /// the one currently being attempted.
    pub fn record_failure(&mut self, failed: FailedRecord) -> Result<(), ImportError> {
        self.check_can_attempt()?;
        if failed.original_index != self.current {
            return Err(ImportError::OutOfOrder {
                job_id: self.job_id,
                expected: self.current,
                actual: failed.original_index,
            });
        }
        self.failed_records.push(failed);
        self.current += 1;
        Ok(())
    }

    /// Recompute the advisory throughput and ETA from the time spent attempting rows
    pub fn update_rates(&mut self, elapsed: Duration) {
        let (throughput, eta) = compute_rates(self.current, self.total, elapsed);
        self.throughput_rps = throughput;
        self.eta_secs = eta;
    }

    /// Every row has been attempted. Row failures do not stop a job from completing.
    pub fn complete(&mut self) -> Result<(), ImportError> {
        self.require(JobStatus::Processing, "complete")?;
        if !self.total_known || self.current != self.total {
            return Err(self.transition_error("complete before every row was attempted"));
        }
        self.status = JobStatus::Completed;
        self.stage = match self.failed_records.len() {
            0 => "completed".to_string(),
            n => format!("completed with {} failed rows", n),
        };
        self.eta_secs = Some(0.0);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Pipeline-fatal failure: the job as a whole could not run
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), ImportError> {
        if self.status.is_terminal() {
            return Err(self.transition_error("fail"));
        }
        self.status = JobStatus::Failed;
        self.stage = "failed".to_string();
        self.error = Some(error.into());
        self.eta_secs = None;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// The upload itself never arrived. Only valid before processing starts.
    pub fn fail_upload(&mut self, error: impl Into<String>) -> Result<(), ImportError> {
        self.require(JobStatus::Uploading, "fail the upload")?;
        self.fail(error)
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.job_id,
            table_name: self.table_name.clone(),
            file_name: self.file_name.clone(),
            status: self.status,
            stage: self.stage.clone(),
            current: self.current,
            total: self.total,
            success_count: self.success_count,
            failed_count: self.failed_records.len() as u64,
            error: self.error.clone(),
            throughput_rps: self.throughput_rps,
            eta_secs: self.eta_secs,
            is_complete: self.is_complete(),
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }

    /// The terminal result handed to callers; only available once the job has finished
    pub fn result(&self) -> Result<ImportResult, ImportError> {
        if !self.is_complete() {
            return Err(ImportError::NotTerminal(self.job_id));
        }
        let mut result = ImportResult::from_parts(self.success_count, self.failed_records.clone());
        if let Some(ref error) = self.error {
            result.errors.insert(0, error.clone());
        }
        Ok(result)
    }

    fn check_can_attempt(&self) -> Result<(), ImportError> {
        self.require(JobStatus::Processing, "attempt a row")?;
        if !self.total_known {
            return Err(self.transition_error("attempt a row before the row count is known"));
        }
        if self.current >= self.total {
            return Err(ImportError::ProgressOverflow {
                job_id: self.job_id,
                total: self.total,
            });
        }
        Ok(())
    }

    fn require(&self, status: JobStatus, action: &'static str) -> Result<(), ImportError> {
        if self.status != status {
            return Err(self.transition_error(action));
        }
        Ok(())
    }

    fn transition_error(&self, action: &'static str) -> ImportError {
        ImportError::InvalidTransition {
            job_id: self.job_id,
            status: self.status,
            action,
        }
    }
}

/// Throughput (rows/s) and ETA (s). `None` where the inputs cannot support a figure.
pub fn compute_rates(current: u64, total: u64, elapsed: Duration) -> (Option<f64>, Option<f64>) {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return (None, None);
    }

    let throughput = current as f64 / secs;
    if throughput <= 0.0 || total == 0 {
        return (Some(throughput), None);
    }

    let remaining = total.saturating_sub(current) as f64;
    (Some(throughput), Some(remaining / throughput))
}
