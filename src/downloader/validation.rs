// Request body validation
//
// Bodies are deserialized loosely (every field optional, any JSON type) so
// that all violations can be reported together as field errors instead of
// failing on the first serde mismatch.

use serde::Deserialize;
use serde_json::Value;

use super::errors::{DownloadError, FieldError};
use super::models::{DownloadRequest, OutputFormat, TimeRange};
use super::youtube_url::extract_video_id;

/// Raw body of `POST /api/video-info`
#[derive(Debug, Default, Deserialize)]
pub struct VideoInfoBody {
    #[serde(default)]
    pub url: Option<Value>,
}

impl VideoInfoBody {
    /// Returns the trimmed URL once it matches a supported YouTube pattern.
    pub fn validate(&self) -> Result<String, DownloadError> {
        let url = match self.url.as_ref().and_then(Value::as_str) {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => {
                return Err(DownloadError::invalid_request(vec![FieldError::new(
                    "url",
                    "URL is required",
                )]))
            }
        };

        if extract_video_id(&url).is_none() {
            return Err(DownloadError::InvalidUrl(url));
        }
        Ok(url)
    }
}

/// Raw body of `POST /api/download`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequestBody {
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub format: Option<Value>,
    #[serde(default)]
    pub quality: Option<Value>,
    #[serde(default)]
    pub start_time: Option<Value>,
    #[serde(default)]
    pub end_time: Option<Value>,
}

impl DownloadRequestBody {
    /// Check the body shape, then the URL pattern.
    pub fn validate(&self) -> Result<DownloadRequest, DownloadError> {
        let mut errors = Vec::new();

        let url = match self.url.as_ref() {
            None | Some(Value::Null) => {
                errors.push(FieldError::new("url", "Required"));
                None
            }
            Some(Value::String(s)) => match url::Url::parse(s.trim()) {
                Ok(_) => Some(s.trim().to_string()),
                Err(_) => {
                    errors.push(FieldError::new("url", "Invalid URL format"));
                    None
                }
            },
            Some(_) => {
                errors.push(FieldError::new("url", "Expected string"));
                None
            }
        };

        let format = match self.format.as_ref().and_then(Value::as_str) {
            Some(s) => match s.parse::<OutputFormat>() {
                Ok(format) => Some(format),
                Err(message) => {
                    errors.push(FieldError::new("format", message));
                    None
                }
            },
            None => {
                errors.push(FieldError::new("format", OutputFormat::unsupported_message()));
                None
            }
        };

        let quality = match self.quality.as_ref() {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.trim().to_string()).filter(|q| !q.is_empty()),
            Some(_) => {
                errors.push(FieldError::new("quality", "Expected string"));
                None
            }
        };

        let start = parse_seconds(
            self.start_time.as_ref(),
            "startTime",
            "Start time must be positive",
            &mut errors,
        );
        let end = parse_seconds(
            self.end_time.as_ref(),
            "endTime",
            "End time must be positive",
            &mut errors,
        );

        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                errors.push(FieldError::new(
                    "endTime",
                    "End time must be greater than start time",
                ));
            }
        }

        if !errors.is_empty() {
            return Err(DownloadError::invalid_request(errors));
        }

        let (url, format) = match (url, format) {
            (Some(url), Some(format)) => (url, format),
            _ => return Err(DownloadError::invalid_request(Vec::new())),
        };

        let video_id = extract_video_id(&url).ok_or_else(|| DownloadError::InvalidUrl(url.clone()))?;

        Ok(DownloadRequest {
            url,
            video_id,
            format,
            quality,
            range: TimeRange { start, end },
        })
    }
}

fn parse_seconds(
    value: Option<&Value>,
    field: &str,
    negative_message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(seconds) if seconds >= 0.0 => Some(seconds),
            _ => {
                errors.push(FieldError::new(field, negative_message));
                None
            }
        },
        Some(_) => {
            errors.push(FieldError::new(field, "Expected number"));
            None
        }
    }
}

/// Check a trim window against the source duration in seconds.
///
/// A start at or past the end of the source is rejected, as is an end past it.
pub fn validate_time_range(range: &TimeRange, duration_seconds: u64) -> Result<(), DownloadError> {
    let duration = duration_seconds as f64;

    if range.start.map_or(false, |start| start >= duration) {
        return Err(DownloadError::InvalidTimeRange(
            "Start time cannot exceed video duration".to_string(),
        ));
    }
    if range.end.map_or(false, |end| end > duration) {
        return Err(DownloadError::InvalidTimeRange(
            "End time cannot exceed video duration".to_string(),
        ));
    }
    Ok(())
}
