//! Error types for MDM

use thiserror::Error;

/// Result type alias for MDM operations
pub type Result<T> = std::result::Result<T, MdmError>;

/// Main error type for MDM
#[derive(Error, Debug)]
pub enum MdmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No failed record at original index {0}")]
    UnknownRecord(u64),

    #[error("Invalid job status: {0}")]
    InvalidStatus(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
