//! Caller-side view of a finished import
//!
//! Retries are reconciled by the caller, not by the server: the Retry endpoint
//! never touches the job it came from. A caller takes the terminal
//! [`ImportResult`], wraps it in an [`ImportResultView`], edits failed rows in
//! place, and applies each retry outcome to this local copy.
//!
//! Entries are addressed by `original_index`. Removing or updating one entry
//! never renumbers, reorders, or otherwise touches any other entry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MdmError, Result};
use crate::types::{FailedRecord, ImportResult, RawRow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResultView {
    job_id: Uuid,
    table_name: String,
    success: u64,
    failed_records: Vec<FailedRecord>,
}

impl ImportResultView {
    pub fn new(job_id: Uuid, table_name: impl Into<String>, result: ImportResult) -> Self {
        let mut failed_records = result.failed_records;
        failed_records.sort_by_key(|r| r.original_index);
        failed_records.dedup_by_key(|r| r.original_index);

        Self {
            job_id,
            table_name: table_name.into(),
            success: result.success,
            failed_records,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn success(&self) -> u64 {
        self.success
    }

    pub fn failed(&self) -> u64 {
        self.failed_records.len() as u64
    }

    /// Failed rows, in source order
    pub fn failed_records(&self) -> &[FailedRecord] {
        &self.failed_records
    }

    pub fn get(&self, original_index: u64) -> Option<&FailedRecord> {
        self.position(original_index)
            .ok()
            .map(|pos| &self.failed_records[pos])
    }

    /// True once every failed row has been fixed
    pub fn is_clean(&self) -> bool {
        self.failed_records.is_empty()
    }

    /// Set one field of a failed row ahead of a retry
    pub fn edit_field(
        &mut self,
        original_index: u64,
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let pos = self.position(original_index)?;
        self.failed_records[pos].record.insert(field.into(), value);
        Ok(())
    }

    /// Replace the whole record of a failed row
    pub fn replace_record(&mut self, original_index: u64, record: RawRow) -> Result<()> {
        let pos = self.position(original_index)?;
        self.failed_records[pos].record = record;
        Ok(())
    }

    /// The record as it should be sent to the Retry endpoint
    pub fn record_for_retry(&self, original_index: u64) -> Result<RawRow> {
        let pos = self.position(original_index)?;
        Ok(self.failed_records[pos].record.clone())
    }

    /// The retry stored the row: drop exactly that entry and count it as a success.
    pub fn apply_retry_success(&mut self, original_index: u64) -> Result<FailedRecord> {
        let pos = self.position(original_index)?;
        let fixed = self.failed_records.remove(pos);
        self.success += 1;
        Ok(fixed)
    }

    /// The retry was rejected again: keep the entry, show the new reason.
    pub fn apply_retry_failure(&mut self, original_index: u64, error: impl Into<String>) -> Result<()> {
        let pos = self.position(original_index)?;
        self.failed_records[pos].error = error.into();
        Ok(())
    }

    /// Current state of the view as a result summary
    pub fn to_result(&self) -> ImportResult {
        ImportResult::from_parts(self.success, self.failed_records.clone())
    }

    // failed_records is kept sorted by original_index, so lookups can bisect
    fn position(&self, original_index: u64) -> Result<usize> {
        self.failed_records
            .binary_search_by_key(&original_index, |r| r.original_index)
            .map_err(|_| MdmError::UnknownRecord(original_index))
    }
}
