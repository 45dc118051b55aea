// Common data models for the download pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest source the service accepts, in seconds (10 minutes)
pub const MAX_DURATION_SECONDS: u64 = 600;

/// Output container/codec the client can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
    Webm,
    Avi,
    Mp3,
    Wav,
    M4a,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        Self::Mp4,
        Self::Webm,
        Self::Avi,
        Self::Mp3,
        Self::Wav,
        Self::M4a,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Avi => "avi",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::M4a => "m4a",
        }
    }

    /// Whether the output carries no video track
    pub fn is_audio_only(&self) -> bool {
        matches!(self, Self::Mp3 | Self::Wav | Self::M4a)
    }

    pub fn file_extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Avi => "video/x-msvideo",
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::M4a => "audio/mp4",
        }
    }

    /// Error text listing every supported format
    pub fn unsupported_message() -> String {
        format!(
            "Invalid format. Supported formats: {}",
            Self::ALL
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }

    /// Bitrate used for lossy audio outputs when the client gives none
    pub fn default_audio_bitrate(&self) -> Option<&'static str> {
        match self {
            Self::Mp3 | Self::M4a => Some("192k"),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(Self::unsupported_message)
    }
}

/// Coarse video quality bucket, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    Tiny,
    Small,
    Medium,
    Large,
    Hd720,
    Hd1080,
    Hd1440,
    Hd2160,
    Highres,
}

impl VideoQuality {
    pub fn from_height(height: Option<u32>) -> Self {
        match height.unwrap_or(0) {
            0..=144 => Self::Tiny,
            145..=240 => Self::Small,
            241..=360 => Self::Medium,
            361..=480 => Self::Large,
            481..=720 => Self::Hd720,
            721..=1080 => Self::Hd1080,
            1081..=1440 => Self::Hd1440,
            1441..=2160 => Self::Hd2160,
            _ => Self::Highres,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Hd720 => "hd720",
            Self::Hd1080 => "hd1080",
            Self::Hd1440 => "hd1440",
            Self::Hd2160 => "hd2160",
            Self::Highres => "highres",
        }
    }
}

/// Audio quality bucket derived from the average bitrate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioQuality {
    AudioQualityLow,
    AudioQualityMedium,
    AudioQualityHigh,
}

impl AudioQuality {
    pub fn from_bitrate(kbps: Option<u32>) -> Self {
        match kbps.unwrap_or(0) {
            0..=95 => Self::AudioQualityLow,
            96..=159 => Self::AudioQualityMedium,
            _ => Self::AudioQualityHigh,
        }
    }
}

/// Rendition carrying video (and, for downloadable variants, audio)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoVariant {
    #[serde(rename = "itag")]
    pub format_tag: String,
    pub container: String,
    pub quality: VideoQuality,
    pub quality_label: String,
    pub has_audio: bool,
    pub has_video: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

/// Audio-only rendition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioVariant {
    #[serde(rename = "itag")]
    pub format_tag: String,
    pub container: String,
    pub quality: VideoQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<u32>,
    pub audio_quality: AudioQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

/// Metadata returned to the client by `/api/video-info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub description: String,
    /// Whole seconds, kept as a string like the source reports it
    pub duration: String,
    pub views: String,
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub video_formats: Vec<VideoVariant>,
    pub audio_formats: Vec<AudioVariant>,
}

impl VideoMetadata {
    pub fn duration_seconds(&self) -> u64 {
        self.duration.parse().unwrap_or(0)
    }
}

/// Trim window in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeRange {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl TimeRange {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Output length implied by the window, never an absolute end time
    pub fn duration(&self) -> Option<f64> {
        self.end.map(|end| end - self.start.unwrap_or(0.0))
    }
}

/// A validated download request
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub video_id: String,
    pub format: OutputFormat,
    pub quality: Option<String>,
    pub range: TimeRange,
}

/// Variant chosen for a download
#[derive(Debug, Clone, PartialEq)]
pub enum SelectedVariant {
    Video(VideoVariant),
    Audio(AudioVariant),
}

impl SelectedVariant {
    pub fn format_tag(&self) -> &str {
        match self {
            Self::Video(v) => &v.format_tag,
            Self::Audio(a) => &a.format_tag,
        }
    }

    pub fn container(&self) -> &str {
        match self {
            Self::Video(v) => &v.container,
            Self::Audio(a) => &a.container,
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        match self {
            Self::Video(v) => v.content_length,
            Self::Audio(a) => a.content_length,
        }
    }

    pub fn has_video(&self) -> bool {
        matches!(self, Self::Video(v) if v.has_video)
    }

    pub fn has_audio(&self) -> bool {
        match self {
            Self::Video(v) => v.has_audio,
            Self::Audio(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("mp3".parse::<OutputFormat>(), Ok(OutputFormat::Mp3));
        assert_eq!(" WebM ".parse::<OutputFormat>(), Ok(OutputFormat::Webm));
        let err = "flac".parse::<OutputFormat>().unwrap_err();
        assert_eq!(
            err,
            "Invalid format. Supported formats: mp4, webm, avi, mp3, wav, m4a"
        );
    }

    #[test]
    fn test_mime_table() {
        assert_eq!(OutputFormat::Mp4.mime_type(), "video/mp4");
        assert_eq!(OutputFormat::Avi.mime_type(), "video/x-msvideo");
        assert_eq!(OutputFormat::Mp3.mime_type(), "audio/mpeg");
        assert_eq!(OutputFormat::Wav.mime_type(), "audio/wav");
        assert!(OutputFormat::M4a.is_audio_only());
        assert!(!OutputFormat::Webm.is_audio_only());
    }

    #[test]
    fn test_quality_buckets_are_ordered() {
        assert_eq!(VideoQuality::from_height(Some(720)), VideoQuality::Hd720);
        assert_eq!(VideoQuality::from_height(Some(360)), VideoQuality::Medium);
        assert_eq!(VideoQuality::from_height(None), VideoQuality::Tiny);
        assert!(VideoQuality::Hd1080 > VideoQuality::Hd720);
        assert_eq!(
            AudioQuality::from_bitrate(Some(160)),
            AudioQuality::AudioQualityHigh
        );
    }

    #[test]
    fn test_range_duration_is_relative() {
        let range = TimeRange {
            start: Some(10.0),
            end: Some(40.0),
        };
        assert_eq!(range.duration(), Some(30.0));
        let open = TimeRange {
            start: Some(10.0),
            end: None,
        };
        assert_eq!(open.duration(), None);
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let meta = VideoMetadata {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: "t".to_string(),
            description: String::new(),
            duration: "213".to_string(),
            views: "1".to_string(),
            channel: "c".to_string(),
            thumbnail: None,
            video_formats: vec![],
            audio_formats: vec![],
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["videoId"], "dQw4w9WgXcQ");
        assert!(json.get("videoFormats").is_some());
        assert_eq!(meta.duration_seconds(), 213);
    }
}
