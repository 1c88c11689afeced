//! Import executor
//!
//! Runs one import job end to end on its own tokio task:
//!
//! 1. Reject an unknown target table (pipeline-fatal, no rows attempted)
//! 2. `uploading -> processing`, parse the upload (any parse error is fatal)
//! 3. Fix the row count, apply the empty-file policy
//! 4. Validate and store each row in source order; a rejected row becomes a
//!    [`FailedRecord`] and the job carries on
//! 5. Complete once every row has been attempted
//!
//! Each row's outcome, the stage text, and any rate refresh are committed in a
//! single registry mutation, so pollers never see a counter that ran ahead of
//! the rest of the job. Stored rows are never rolled back.

use mdm_common::types::{FailedRecord, RawRow};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use super::error::{ImportError, RowError};
use super::parser::{parse_rows, Upload};
use super::registry::JobRegistry;
use super::store::RecordStore;
use super::validator::RowValidator;

pub const DEFAULT_PROGRESS_INTERVAL_ROWS: u64 = 100;
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// What to do with an upload that parses to zero rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyFilePolicy {
    /// Finish as `completed` with nothing imported
    #[default]
    Complete,
    /// Treat as pipeline-fatal
    Fail,
}

impl FromStr for EmptyFilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "complete" | "completed" => Ok(EmptyFilePolicy::Complete),
            "fail" | "failed" => Ok(EmptyFilePolicy::Fail),
            other => Err(format!("unknown empty file policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Refresh throughput/ETA at least every this many rows
    pub progress_interval_rows: u64,
    /// ...or whenever this much time has passed since the last refresh
    pub progress_interval: Duration,
    pub empty_file: EmptyFilePolicy,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            progress_interval_rows: DEFAULT_PROGRESS_INTERVAL_ROWS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            empty_file: EmptyFilePolicy::default(),
        }
    }
}

/// A row that made it into the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub key: String,
    pub id: Uuid,
}

/// Validate one row and persist it. Shared by imports and single-record retries.
pub async fn validate_and_store(
    validator: &dyn RowValidator,
    store: &dyn RecordStore,
    table: &str,
    row: &RawRow,
) -> Result<StoredRow, RowError> {
    let record = validator.validate(table, row)?;
    let id = store
        .insert(&record)
        .await
        .map_err(|e| RowError::Persistence(e.to_string()))?;
    Ok(StoredRow {
        key: record.key,
        id,
    })
}

#[derive(Clone)]
pub struct ImportExecutor {
    registry: JobRegistry,
    validator: Arc<dyn RowValidator>,
    store: Arc<dyn RecordStore>,
    settings: ImportSettings,
}

impl ImportExecutor {
    pub fn new(
        registry: JobRegistry,
        validator: Arc<dyn RowValidator>,
        store: Arc<dyn RecordStore>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            registry,
            validator,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Run the job on its own task. Returns immediately.
    pub fn spawn(&self, job_id: Uuid, upload: Upload) -> JoinHandle<()> {
        let executor = self.clone();
        let span = tracing::info_span!("import_job", %job_id);

        tokio::spawn(
            async move {
                let registry = executor.registry.clone();
                let worker =
                    tokio::spawn(async move { executor.run(job_id, upload).await }.in_current_span());

                let reason = match worker.await {
                    Ok(Ok(())) => return,
                    Ok(Err(e)) => {
                        error!(error = %e, "Import job bookkeeping failed");
                        format!("Import aborted: {e}")
                    }
                    Err(e) => {
                        error!(error = %e, "Import job task panicked");
                        "Import aborted: internal error".to_string()
                    }
                };

                // Never leave the job in a non-terminal state
                if let Err(e) = registry.mutate(job_id, |job| job.fail(reason)).await {
                    debug!(error = %e, "Aborted import job was already settled");
                }
            }
            .instrument(span),
        )
    }

    /// Drive the job to a terminal state.
    ///
    /// Pipeline and row failures are recorded on the job; an `Err` here means
    /// the job itself could not be updated (unknown id, already terminal).
    pub async fn run(&self, job_id: Uuid, upload: Upload) -> Result<(), ImportError> {
        let table = self
            .registry
            .view(job_id, |job| job.table_name().to_string())
            .await?;

        if !self.validator.knows_table(&table) {
            let message = format!("Unknown target table '{}'", table);
            error!(%job_id, table = %table, "{}", message);
            return self.registry.mutate(job_id, |job| job.fail(message)).await;
        }

        self.registry
            .mutate(job_id, |job| job.begin_processing())
            .await?;
        info!(
            %job_id,
            table = %table,
            format = %upload.format,
            bytes = upload.bytes.len(),
            "Import started"
        );

        let format = upload.format;
        let parsed = tokio::task::spawn_blocking(move || parse_rows(format, &upload.bytes)).await;
        let rows = match parsed {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                let message = format!("File could not be read: {}", e);
                error!(%job_id, error = %e, "Import failed while parsing");
                return self.registry.mutate(job_id, |job| job.fail(message)).await;
            }
            Err(e) => {
                let message = format!("File could not be read: {}", e);
                error!(%job_id, error = %e, "Parser task did not finish");
                return self.registry.mutate(job_id, |job| job.fail(message)).await;
            }
        };

        let total = rows.len() as u64;
        self.registry
            .mutate(job_id, |job| job.set_total(total))
            .await?;
        debug!(%job_id, total, "Row count known");

        if total == 0 {
            return match self.settings.empty_file {
                EmptyFilePolicy::Complete => {
                    info!(%job_id, "Empty upload, nothing to import");
                    self.registry.mutate(job_id, |job| job.complete()).await
                }
                EmptyFilePolicy::Fail => {
                    warn!(%job_id, "Empty upload rejected");
                    self.registry
                        .mutate(job_id, |job| job.fail("File contains no rows"))
                        .await
                }
            };
        }

        self.process_rows(job_id, &table, rows).await?;

        let snapshot = self
            .registry
            .mutate(job_id, |job| {
                job.complete()?;
                Ok(job.snapshot())
            })
            .await?;
        info!(
            %job_id,
            table = %table,
            success = snapshot.success_count,
            failed = snapshot.failed_count,
            "Import completed"
        );
        Ok(())
    }

    async fn process_rows(&self, job_id: Uuid, table: &str, rows: Vec<RawRow>) -> Result<(), ImportError> {
        let total = rows.len() as u64;
        let started = Instant::now();
        let mut last_refresh = started;
        let mut rows_since_refresh = 0u64;

        for (index, row) in rows.into_iter().enumerate() {
            let index = index as u64;
            let outcome =
                validate_and_store(self.validator.as_ref(), self.store.as_ref(), table, &row).await;

            rows_since_refresh += 1;
            let is_last = index + 1 == total;
            let refresh = is_last
                || rows_since_refresh >= self.settings.progress_interval_rows
                || last_refresh.elapsed() >= self.settings.progress_interval;
            let elapsed = started.elapsed();
            let stage = format!("validating row {} of {}", index + 1, total);

            let failed = match outcome {
                Ok(_) => None,
                Err(e) => {
                    warn!(%job_id, row = index + 1, error = %e, "Row rejected");
                    Some(FailedRecord {
                        original_index: index,
                        record: row,
                        error: e.to_string(),
                    })
                }
            };

            self.registry
                .mutate(job_id, move |job| {
                    match failed {
                        None => job.record_success()?,
                        Some(failed) => job.record_failure(failed)?,
                    }
                    job.set_stage(stage)?;
                    if refresh {
                        job.update_rates(elapsed);
                    }
                    Ok(())
                })
                .await?;

            if refresh {
                last_refresh = Instant::now();
                rows_since_refresh = 0;
            }
        }

        Ok(())
    }
}
