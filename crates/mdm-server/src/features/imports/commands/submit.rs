//! Submit import command
//!
//! Submission is split in two so the job is visible while its bytes are still
//! arriving: [`begin`] registers the job in `uploading` before the upload is
//! read, then [`handle`] hands the received file to the executor. If reading
//! the upload fails, [`abort`] records it on the job. An [`UploadGuard`] held
//! across the read fails the job when the request is dropped part way, so a
//! job never stays in `uploading` after its request is gone.

use mediator::Request;
use mdm_common::types::{JobStatus, SubmitImportResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::imports::{FileFormat, ImportError, ImportService, Upload};

/// A fully received upload for a registered job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitImportCommand {
    pub job_id: Uuid,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// `csv`, `json` or `jsonl`; detected from the file name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitImportError {
    #[error("Target table is required")]
    TableRequired,

    #[error("{0}")]
    Upload(String),

    #[error(transparent)]
    Job(#[from] ImportError),
}

impl Request<Result<SubmitImportResponse, SubmitImportError>> for SubmitImportCommand {}

/// Register a job for `table` before its upload is read
pub async fn begin(service: &ImportService, table: &str) -> Result<Uuid, SubmitImportError> {
    let table = table.trim();
    if table.is_empty() {
        return Err(SubmitImportError::TableRequired);
    }
    Ok(service.begin_upload(table).await)
}

/// The upload could not be received; the job fails and the caller gets the reason
pub async fn abort(service: &ImportService, job_id: Uuid, reason: String) -> SubmitImportError {
    if let Err(e) = service.abort_upload(job_id, &reason).await {
        tracing::warn!(%job_id, error = %e, "Could not mark aborted upload as failed");
    }
    SubmitImportError::Upload(reason)
}

/// Reason recorded on a job whose request went away mid-upload
pub const UPLOAD_INTERRUPTED: &str = "upload interrupted";

/// Fails the job on drop unless [`UploadGuard::disarm`] was called first
pub struct UploadGuard {
    service: ImportService,
    job_id: Uuid,
    armed: bool,
}

impl UploadGuard {
    pub fn arm(service: &ImportService, job_id: Uuid) -> Self {
        Self {
            service: service.clone(),
            job_id,
            armed: true,
        }
    }

    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let job_id = self.job_id;
        tracing::warn!(%job_id, "Upload request dropped before the file was received");

        // Drop cannot await; hand the abort to the runtime
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let service = self.service.clone();
        runtime.spawn(async move {
            if let Err(e) = service.abort_upload(job_id, UPLOAD_INTERRUPTED).await {
                tracing::debug!(%job_id, error = %e, "Interrupted upload was already settled");
            }
        });
    }
}

#[tracing::instrument(skip(service, command), fields(job_id = %command.job_id, table = %command.table))]
pub async fn handle(
    service: ImportService,
    command: SubmitImportCommand,
) -> Result<SubmitImportResponse, SubmitImportError> {
    let format = match FileFormat::detect(command.format.as_deref(), command.file_name.as_deref()) {
        Ok(format) => format,
        Err(e) => {
            // Unsupported formats are an unreadable file: the job fails, the submission is still accepted.
            let message = format!("File could not be read: {}", e);
            service
                .registry()
                .mutate(command.job_id, |job| job.fail(message))
                .await?;
            return Ok(SubmitImportResponse {
                job_id: command.job_id,
                table_name: command.table,
                status: JobStatus::Failed,
            });
        }
    };

    let upload = Upload {
        file_name: command.file_name,
        format,
        bytes: command.bytes,
    };
    service.submit(command.job_id, upload);

    let status = service.registry().get(command.job_id).await?.status;
    Ok(SubmitImportResponse {
        job_id: command.job_id,
        table_name: command.table,
        status,
    })
}
