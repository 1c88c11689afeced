//! Error types for MDM CLI
//!
//! User-facing errors with messages that say what to do next.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// The server answered with an error envelope
    #[error("{message} ({code})")]
    Api { status: u16, code: String, message: String },

    /// The server answered with something that is not an envelope
    #[error("Unexpected server response: {0}. Check that --server-url points at an MDM server.")]
    UnexpectedResponse(String),

    /// Required file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// No stored result for a job
    #[error("No result stored for job {0}. Run 'mdm result {0}' first.")]
    NoStoredResult(uuid::Uuid),

    /// A `--set` argument is malformed
    #[error("Invalid field edit '{0}'. Expected FIELD=VALUE.")]
    InvalidEdit(String),

    /// Import job ended in the failed state
    #[error("Import failed: {0}")]
    ImportFailed(String),

    /// Reconciliation against the local result failed
    #[error("{0}")]
    Reconcile(#[from] mdm_common::MdmError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check that the server is running and --server-url is correct.")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}.")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables.")]
    Config(String),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an API error from a decoded error envelope
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Error code from the server, if this is an API error
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = CliError::api(422, "VALIDATION_ERROR", "price: must be a number");
        assert_eq!(err.to_string(), "price: must be a number (VALIDATION_ERROR)");
        assert_eq!(err.api_code(), Some("VALIDATION_ERROR"));
    }

    #[test]
    fn test_reconcile_error_passes_message_through() {
        let err: CliError = mdm_common::MdmError::UnknownRecord(4).into();
        assert_eq!(err.to_string(), "No failed record at original index 4");
        assert_eq!(err.api_code(), None);
    }
}
