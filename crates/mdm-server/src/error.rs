//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;

/// Application error types, rendered as the standard error envelope
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnknownTable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Upload(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotTerminal(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::UnknownTable(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotTerminal(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::UnknownTable(_) => "UNKNOWN_TABLE",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Upload(_) => "UPLOAD_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotTerminal(_) => "NOT_TERMINAL",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                "An internal error occurred".to_string()
            }
            ref other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(self.code(), message))).into_response()
    }
}
