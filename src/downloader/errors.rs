// Error types for the download pipeline

use serde::Serialize;
use thiserror::Error;

use super::extractors::{diagnose_error, BlockingReason};

/// A single schema violation in a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path of the offending field (e.g. `["endTime"]`)
    pub path: Vec<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            path: if field.is_empty() {
                Vec::new()
            } else {
                vec![field.to_string()]
            },
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Not a supported YouTube watch/short URL
    #[error("Invalid YouTube URL")]
    InvalidUrl(String),

    /// Request body failed schema validation
    #[error("{message}")]
    InvalidRequest {
        message: String,
        errors: Vec<FieldError>,
    },

    /// Requested time range does not fit the source
    #[error("{0}")]
    InvalidTimeRange(String),

    /// Source is longer than the allowed maximum
    #[error("Video is too long. Maximum duration allowed is {} minutes.", .max_seconds / 60)]
    SourceTooLong { duration_seconds: u64, max_seconds: u64 },

    /// No variant satisfies the requested format/quality
    #[error("No suitable format found for {format} {quality}")]
    NoMatchingFormat { format: String, quality: String },

    /// yt-dlp or ffmpeg not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Extraction tool reported a failure
    #[error("Extraction failed: {message}")]
    Extraction {
        message: String,
        reason: Option<BlockingReason>,
    },

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Transcoding process failed
    #[error("Conversion failed: {0}")]
    Transcode(String),

    /// Upstream byte stream could not be opened
    #[error("Stream error: {0}")]
    Stream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Build an extraction error from raw tool stderr, classifying it on the way.
    pub fn extraction(stderr: impl Into<String>) -> Self {
        let message = stderr.into();
        let reason = diagnose_error(&message);
        Self::Extraction { message, reason }
    }

    pub fn invalid_request(errors: Vec<FieldError>) -> Self {
        let message = if errors.is_empty() {
            "Invalid request data".to_string()
        } else {
            errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        };
        Self::InvalidRequest { message, errors }
    }

    /// Whether this error is caused by the client's input (4xx) rather than
    /// an upstream tool failure (5xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_)
                | Self::InvalidRequest { .. }
                | Self::InvalidTimeRange(_)
                | Self::SourceTooLong { .. }
                | Self::NoMatchingFormat { .. }
        )
    }
}
