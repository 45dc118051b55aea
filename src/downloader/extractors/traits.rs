// InfoExtractor trait and raw extraction types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::downloader::errors::DownloadError;
use crate::downloader::traits::ByteStream;

/// Configuration for info extraction
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Explicit path to the yt-dlp binary
    pub ytdlp_path: Option<String>,
    /// SOCKS5/HTTP proxy URL, also used for stream fetches
    pub proxy: Option<String>,
    /// Path to cookies.txt file
    pub cookies_path: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// YouTube player client (android, web, tv)
    pub player_client: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            proxy: None,
            cookies_path: None,
            timeout_seconds: 30,
            player_client: None,
        }
    }
}

impl ExtractorConfig {
    pub fn with_ytdlp_path(mut self, path: Option<String>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_cookies_path(mut self, path: Option<String>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_player_client(mut self, client: Option<String>) -> Self {
        self.player_client = client;
        self
    }
}

/// Format entry as reported by yt-dlp
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedFormat {
    /// Format ID (e.g., "18", "140", "251-drc")
    pub format_id: String,
    /// File extension (mp4, webm, m4a)
    pub ext: String,
    /// Video height in pixels
    pub height: Option<u32>,
    /// Video codec (avc1, vp9, av01, none)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    pub acodec: Option<String>,
    /// File size in bytes
    pub filesize: Option<u64>,
    /// Approximate file size (when exact is unknown)
    pub filesize_approx: Option<u64>,
    /// Audio bitrate in kbps
    pub abr: Option<f32>,
    /// Format note (e.g., "720p", "medium")
    pub format_note: Option<String>,
    /// Direct media URL
    pub url: Option<String>,
    /// Headers yt-dlp says must accompany requests to `url`
    pub http_headers: HashMap<String, String>,
}

impl ExtendedFormat {
    /// Get effective file size (exact or approximate)
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }

    pub fn has_video(&self) -> bool {
        self.vcodec
            .as_ref()
            .map_or(false, |v| v != "none" && !v.is_empty())
    }

    pub fn has_audio(&self) -> bool {
        self.acodec
            .as_ref()
            .map_or(false, |a| a != "none" && !a.is_empty())
    }
}

/// Thumbnail entry as reported by yt-dlp
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub preference: Option<i64>,
}

impl Thumbnail {
    pub fn pixel_area(&self) -> u64 {
        self.width.unwrap_or(0) as u64 * self.height.unwrap_or(0) as u64
    }
}

/// Extended video info with all formats
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedVideoInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub uploader: String,
    /// Whole seconds, rounded up
    pub duration_seconds: u64,
    pub view_count: u64,
    pub thumbnails: Vec<Thumbnail>,
    pub formats: Vec<ExtendedFormat>,
}

impl ExtendedVideoInfo {
    pub fn find_format(&self, format_id: &str) -> Option<&ExtendedFormat> {
        self.formats.iter().find(|f| f.format_id == format_id)
    }
}

/// Trait for info extractors
#[async_trait]
pub trait InfoExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Extract video info with formats
    async fn extract(&self, url: &str) -> Result<ExtendedVideoInfo, DownloadError>;

    /// Open the raw byte stream of one format
    async fn open_stream(&self, format: &ExtendedFormat) -> Result<ByteStream, DownloadError>;
}
