//! Import API routes
//!
//! - `POST /api/v1/imports?table=items` - Submit an upload (multipart `file`, optional `format`)
//! - `GET /api/v1/imports?status=&table=&since=&wait_ms=` - Poll job snapshots
//! - `GET /api/v1/imports/:job_id` - One job snapshot
//! - `GET /api/v1/imports/:job_id/result` - Result of a finished job
//! - `GET /api/v1/tables` - Importable tables and their fields
//! - `GET /api/v1/tables/:table/records?limit=` - Most recently stored records of a table
//! - `POST /api/v1/tables/:table/retry` - Retry one edited record

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::commands::{
    retry::handle as handle_retry,
    submit::{self, handle as handle_submit},
    RetryRecordCommand, RetryRecordError, SubmitImportCommand, SubmitImportError, UploadGuard,
};
use super::queries::{
    get_job::handle as handle_get_job, get_result::handle as handle_get_result,
    list_jobs::handle as handle_list_jobs, list_records::handle as handle_list_records,
    list_tables::handle as handle_list_tables, GetImportResultError, GetImportResultQuery,
    GetJobError, GetJobQuery, ListJobsError, ListJobsQuery, ListRecordsError, ListRecordsQuery,
    ListTablesQuery,
};
use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::FeatureState;
use crate::imports::{ImportService, RetryError};

pub fn imports_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", post(submit_import).get(list_jobs))
        .route("/:job_id", get(get_job))
        .route("/:job_id/result", get(get_result))
}

pub fn tables_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_tables))
        .route("/:table/records", get(list_records))
        .route("/:table/retry", post(retry_record))
}

#[derive(Debug, Deserialize)]
struct SubmitParams {
    table: String,
}

#[derive(Debug, Deserialize)]
struct RecordsParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RetryBody {
    record: mdm_common::types::RawRow,
}

// ============================================================================
// Command Handlers
// ============================================================================

/// Submit an import
///
/// The job is registered before the upload body is read, so it shows up as
/// `uploading` to pollers while the file arrives. Responds `202 Accepted` as
/// soon as the executor has been started; unknown tables and unreadable files
/// are reported on the job, not here. If the request is dropped before the
/// file has been handed over, the job is failed as interrupted.
#[tracing::instrument(skip(state, params, multipart), fields(table = %params.table))]
async fn submit_import(
    State(state): State<FeatureState>,
    Query(params): Query<SubmitParams>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let service = state.imports;
    let job_id = submit::begin(&service, &params.table).await?;
    let guard = UploadGuard::arm(&service, job_id);

    let received = match read_upload(&service, job_id, multipart).await {
        Ok(received) => received,
        Err(e) => {
            guard.disarm();
            return Err(e);
        }
    };

    let command = SubmitImportCommand {
        job_id,
        table: params.table.trim().to_string(),
        file_name: received.file_name,
        format: received.format,
        bytes: received.bytes,
    };
    let outcome = handle_submit(service, command).await;
    guard.disarm();
    let response = outcome?;

    tracing::info!(%job_id, status = %response.status, "Import submitted via API");

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(response))).into_response())
}

struct ReceivedUpload {
    file_name: Option<String>,
    format: Option<String>,
    bytes: Vec<u8>,
}

/// Read the multipart body; any failure here fails the job
async fn read_upload(
    service: &ImportService,
    job_id: Uuid,
    mut multipart: Multipart,
) -> Result<ReceivedUpload, AppError> {
    let mut file_name = None;
    let mut format = None;
    let mut bytes = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(submit::abort(service, job_id, e.body_text()).await.into()),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                if let Some(name) = field.file_name().map(str::to_string) {
                    service.set_file_name(job_id, &name).await.map_err(SubmitImportError::from)?;
                    file_name = Some(name);
                }
                match field.bytes().await {
                    Ok(data) => bytes = Some(data.to_vec()),
                    Err(e) => {
                        return Err(submit::abort(service, job_id, e.body_text()).await.into())
                    }
                }
            }
            Some("format") => match field.text().await {
                Ok(text) => format = Some(text),
                Err(e) => return Err(submit::abort(service, job_id, e.body_text()).await.into()),
            },
            _ => {}
        }
    }

    let Some(bytes) = bytes else {
        let reason = "multipart field 'file' is missing".to_string();
        return Err(submit::abort(service, job_id, reason).await.into());
    };

    Ok(ReceivedUpload {
        file_name,
        format,
        bytes,
    })
}

/// Retry one edited record
///
/// Responds `200` with the stored record's key and id, `404` for an unknown
/// table, and `422` when the record is rejected again.
#[tracing::instrument(skip(state, body), fields(table = %table))]
async fn retry_record(
    State(state): State<FeatureState>,
    Path(table): Path<String>,
    Json(body): Json<RetryBody>,
) -> Result<Response, AppError> {
    let command = RetryRecordCommand {
        table,
        record: body.record,
    };
    let response = handle_retry(state.imports, command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers
// ============================================================================

async fn list_jobs(
    State(state): State<FeatureState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Response, AppError> {
    let response = handle_list_jobs(state.imports, state.long_poll_max, query).await?;

    tracing::debug!(count = response.jobs.len(), revision = response.revision, "Jobs polled");

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

async fn get_job(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let snapshot = handle_get_job(state.imports, GetJobQuery { job_id }).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(snapshot))).into_response())
}

async fn get_result(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let result = handle_get_result(state.imports, GetImportResultQuery { job_id }).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(result))).into_response())
}

async fn list_records(
    State(state): State<FeatureState>,
    Path(table): Path<String>,
    Query(params): Query<RecordsParams>,
) -> Result<Response, AppError> {
    let query = ListRecordsQuery {
        table,
        limit: params.limit,
    };
    let response = handle_list_records(state.imports, query).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

async fn list_tables(State(state): State<FeatureState>) -> Response {
    let tables = handle_list_tables(state.imports, ListTablesQuery::default()).await;
    (StatusCode::OK, Json(ApiResponse::success(tables))).into_response()
}

// ============================================================================
// Error Handling
// ============================================================================

impl From<SubmitImportError> for AppError {
    fn from(err: SubmitImportError) -> Self {
        match err {
            SubmitImportError::TableRequired => AppError::BadRequest(err.to_string()),
            SubmitImportError::Upload(reason) => AppError::Upload(reason),
            SubmitImportError::Job(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<RetryRecordError> for AppError {
    fn from(err: RetryRecordError) -> Self {
        match err {
            RetryRecordError::EmptyRecord => AppError::BadRequest(err.to_string()),
            RetryRecordError::Retry(RetryError::UnknownTable(_)) => {
                AppError::UnknownTable(err.to_string())
            }
            RetryRecordError::Retry(RetryError::Validation(message))
            | RetryRecordError::Retry(RetryError::Persistence(message)) => {
                AppError::Validation(message)
            }
        }
    }
}

impl From<ListJobsError> for AppError {
    fn from(err: ListJobsError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ListRecordsError> for AppError {
    fn from(err: ListRecordsError) -> Self {
        match err {
            ListRecordsError::UnknownTable(_) => AppError::UnknownTable(err.to_string()),
            ListRecordsError::Store(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<GetJobError> for AppError {
    fn from(err: GetJobError) -> Self {
        match err {
            GetJobError::NotFound(_) => AppError::NotFound(err.to_string()),
            GetJobError::Job(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<GetImportResultError> for AppError {
    fn from(err: GetImportResultError) -> Self {
        match err {
            GetImportResultError::NotFound(_) => AppError::NotFound(err.to_string()),
            GetImportResultError::NotTerminal(_) => AppError::NotTerminal(err.to_string()),
            GetImportResultError::Job(e) => AppError::Internal(e.to_string()),
        }
    }
}
