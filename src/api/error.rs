//! API error handling.
//!
//! Every failure that happens before a response starts streaming is turned
//! into a JSON body of the form `{ "message": ..., "errors": [...]? }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::downloader::{DownloadError, FieldError};

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub message: String,
    /// Field-level violations for schema errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub errors: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            message: self.message,
            errors: self.errors,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DownloadError> for ApiError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::InvalidRequest { message, errors } => {
                ApiError::bad_request(message).with_errors(errors)
            }
            err if err.is_client_error() => ApiError::bad_request(err.to_string()),
            DownloadError::Extraction { message, reason } => {
                tracing::error!(
                    reason = reason.map(|r| r.description()).unwrap_or("unclassified"),
                    "Extraction failed: {}",
                    message
                );
                ApiError::internal("Failed to retrieve video information")
            }
            DownloadError::ToolNotFound(tool) => {
                tracing::error!("Required tool not found: {}", tool);
                ApiError::internal("Video processing is unavailable")
            }
            other => {
                tracing::error!("Download pipeline error: {}", other);
                ApiError::internal("Failed to process video")
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
