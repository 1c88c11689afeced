//! HTTP API client for the MDM server

use crate::api::{endpoints, types::*};
use crate::error::{CliError, Result};
use mdm_common::types::{
    ImportResult, JobListResponse, JobSnapshot, RawRow, RetryRequest, RetryResponse,
    SubmitImportResponse, TableInfo,
};
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Can be overridden via MDM_API_TIMEOUT_SECS environment variable.
/// Large uploads are sent in one request, hence the generous default.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 300;

/// Default MDM server URL when not specified via environment variable.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// API client for the MDM server
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: String) -> Result<Self> {
        let timeout_secs = std::env::var("MDM_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("MDM_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());

        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check server health
    pub async fn health_check(&self) -> Result<Option<HealthStatus>> {
        let url = endpoints::health_url(&self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => Ok(response.json().await.ok()),
            _ => Ok(None),
        }
    }

    /// Upload a file into a target table
    ///
    /// The server answers as soon as the upload is received; the import itself
    /// runs in the background and is followed with [`ApiClient::get_job`].
    pub async fn submit_import(
        &self,
        table: &str,
        file_name: &str,
        bytes: Vec<u8>,
        format: Option<&str>,
    ) -> Result<SubmitImportResponse> {
        let url = endpoints::submit_import_url(&self.base_url, table);

        let mut form = multipart::Form::new();
        if let Some(format) = format {
            form = form.text("format", format.to_string());
        }
        form = form.part(
            "file",
            multipart::Part::bytes(bytes).file_name(file_name.to_string()),
        );

        tracing::debug!(%url, file_name, "Submitting import");

        let response = self.client.post(&url).multipart(form).send().await?;
        decode(response).await
    }

    /// Poll all jobs, optionally filtered
    pub async fn list_jobs(
        &self,
        status: Option<&str>,
        table: Option<&str>,
    ) -> Result<JobListResponse> {
        let url = endpoints::jobs_url(&self.base_url, status, table);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    /// Get one job snapshot
    pub async fn get_job(&self, job_id: Uuid) -> Result<JobSnapshot> {
        let url = endpoints::job_url(&self.base_url, job_id);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    /// Get the result of a finished job
    pub async fn get_result(&self, job_id: Uuid) -> Result<ImportResult> {
        let url = endpoints::job_result_url(&self.base_url, job_id);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    /// List importable tables
    pub async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let url = endpoints::tables_url(&self.base_url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    /// Send one edited record for validation and storage
    pub async fn retry_record(&self, table: &str, record: RawRow) -> Result<RetryResponse> {
        let url = endpoints::retry_url(&self.base_url, table);
        let response = self
            .client
            .post(&url)
            .json(&RetryRequest { record })
            .send()
            .await?;
        decode(response).await
    }
}

/// Unwrap a success envelope, or turn an error envelope into [`CliError::Api`]
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        let envelope: ApiResponse<T> = serde_json::from_slice(&body)
            .map_err(|e| CliError::UnexpectedResponse(e.to_string()))?;
        return Ok(envelope.data);
    }

    match serde_json::from_slice::<ErrorEnvelope>(&body) {
        Ok(envelope) => Err(CliError::api(
            status.as_u16(),
            envelope.error.code,
            envelope.error.message,
        )),
        Err(_) => Err(CliError::UnexpectedResponse(format!("HTTP {}", status))),
    }
}
