// Orchestrator - composes extraction, selection and transcoding
//
// fetch_metadata: validate -> extract -> duration gate -> projection
// resolve:        metadata (gated again) -> range check -> variant selection
// open:           raw stream -> direct or through the transcoder

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::DownloadError;
use super::extractors::{ExtendedFormat, ExtendedVideoInfo, InfoExtractor, Thumbnail};
use super::format_selector::FormatSelector;
use super::models::{
    AudioQuality, AudioVariant, DownloadRequest, OutputFormat, SelectedVariant, VideoMetadata,
    VideoQuality, VideoVariant, MAX_DURATION_SECONDS,
};
use super::traits::{ByteStream, Transcoder};
use super::transcoder::ConversionOptions;
use super::utils::{parse_audio_bitrate, sanitize_filename};
use super::validation::validate_time_range;
use super::youtube_url::extract_video_id;

/// A request that passed every check and has a variant to stream from
#[derive(Debug, Clone)]
pub struct ResolvedDownload {
    pub request: DownloadRequest,
    pub metadata: VideoMetadata,
    pub variant: SelectedVariant,
    source: ExtendedFormat,
}

/// Everything the HTTP layer needs to answer a download
pub struct PreparedDownload {
    pub stream: ByteStream,
    pub content_type: &'static str,
    pub filename: String,
    /// Only known when bytes are forwarded unchanged
    pub content_length: Option<u64>,
    pub transcoded: bool,
}

pub struct Downloader {
    extractor: Arc<dyn InfoExtractor>,
    transcoder: Arc<dyn Transcoder>,
}

impl Downloader {
    pub fn new(extractor: Arc<dyn InfoExtractor>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            extractor,
            transcoder,
        }
    }

    /// Metadata for the `/api/video-info` endpoint
    pub async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, DownloadError> {
        let (_, metadata) = self.fetch(url).await?;
        Ok(metadata)
    }

    /// Run everything up to format selection.
    pub async fn resolve(&self, request: DownloadRequest) -> Result<ResolvedDownload, DownloadError> {
        let (info, metadata) = self.fetch(&request.url).await?;

        validate_time_range(&request.range, metadata.duration_seconds())?;

        let variant = FormatSelector::select(&metadata, request.format, request.quality.as_deref())?;
        let source = info
            .find_format(variant.format_tag())
            .cloned()
            .ok_or_else(|| FormatSelector::no_match(request.format, request.quality.as_deref()))?;

        info!(
            video_id = %metadata.video_id,
            format = %request.format,
            variant = %variant.format_tag(),
            container = %variant.container(),
            "Selected variant"
        );

        Ok(ResolvedDownload {
            request,
            metadata,
            variant,
            source,
        })
    }

    /// Open the selected variant and, when needed, wrap it with the transcoder.
    pub async fn open(&self, resolved: &ResolvedDownload) -> Result<PreparedDownload, DownloadError> {
        let request = &resolved.request;
        let format = request.format;
        let filename = format!(
            "{}.{}",
            sanitize_filename(&resolved.metadata.title),
            format.file_extension()
        );

        let raw = self.extractor.open_stream(&resolved.source).await?;

        if Self::is_direct(request, &resolved.variant) {
            debug!(video_id = %resolved.metadata.video_id, "Streaming variant directly");
            return Ok(PreparedDownload {
                stream: raw,
                content_type: format.mime_type(),
                filename,
                // Estimated sizes never become a Content-Length
                content_length: resolved.source.filesize,
                transcoded: false,
            });
        }

        let options = ConversionOptions::new(format)
            .with_range(request.range.start, request.range.end)
            .with_audio_bitrate(Self::audio_bitrate(format, request.quality.as_deref()))
            .with_source_container(Some(resolved.variant.container().to_string()));

        debug!(
            video_id = %resolved.metadata.video_id,
            transcoder = self.transcoder.name(),
            seek = ?options.seek(),
            duration = ?options.duration(),
            "Transcoding variant"
        );

        let stream = self.transcoder.transcode(raw, &options)?;
        Ok(PreparedDownload {
            stream,
            content_type: format.mime_type(),
            filename,
            content_length: None,
            transcoded: true,
        })
    }

    async fn fetch(&self, url: &str) -> Result<(ExtendedVideoInfo, VideoMetadata), DownloadError> {
        let video_id = extract_video_id(url).ok_or_else(|| DownloadError::InvalidUrl(url.to_string()))?;

        let info = match self.extractor.extract(url).await {
            Ok(info) => info,
            Err(e) => {
                if let DownloadError::Extraction {
                    reason: Some(reason),
                    ..
                } = &e
                {
                    warn!(
                        video_id = %video_id,
                        extractor = self.extractor.name(),
                        reason = %reason,
                        permanent = reason.is_permanent(),
                        "Extraction blocked"
                    );
                }
                return Err(e);
            }
        };

        if info.duration_seconds > MAX_DURATION_SECONDS {
            return Err(DownloadError::SourceTooLong {
                duration_seconds: info.duration_seconds,
                max_seconds: MAX_DURATION_SECONDS,
            });
        }

        let metadata = project_metadata(&info, &video_id);
        Ok((info, metadata))
    }

    /// Same container, no trim and a video target: bytes pass through untouched.
    fn is_direct(request: &DownloadRequest, variant: &SelectedVariant) -> bool {
        !request.format.is_audio_only()
            && request.range.is_empty()
            && variant
                .container()
                .eq_ignore_ascii_case(request.format.as_str())
    }

    fn audio_bitrate(format: OutputFormat, quality: Option<&str>) -> Option<String> {
        if format == OutputFormat::Wav {
            return None;
        }
        quality
            .and_then(parse_audio_bitrate)
            .or_else(|| format.default_audio_bitrate().map(String::from))
    }
}

/// Reduce raw extraction output to the fields clients see.
pub fn project_metadata(info: &ExtendedVideoInfo, fallback_id: &str) -> VideoMetadata {
    let video_formats = info
        .formats
        .iter()
        .filter(|f| f.has_video() && f.has_audio())
        .map(|f| VideoVariant {
            format_tag: f.format_id.clone(),
            container: f.ext.clone(),
            quality: VideoQuality::from_height(f.height),
            quality_label: quality_label(f),
            has_audio: true,
            has_video: true,
            content_length: f.effective_size(),
        })
        .collect();

    let audio_formats = info
        .formats
        .iter()
        .filter(|f| f.has_audio() && !f.has_video())
        .map(|f| {
            let kbps = f.abr.map(|abr| abr.round() as u32);
            AudioVariant {
                format_tag: f.format_id.clone(),
                container: f.ext.clone(),
                quality: VideoQuality::Tiny,
                audio_bitrate: kbps,
                audio_quality: AudioQuality::from_bitrate(kbps),
                content_length: f.effective_size(),
            }
        })
        .collect();

    VideoMetadata {
        video_id: if info.id.is_empty() {
            fallback_id.to_string()
        } else {
            info.id.clone()
        },
        title: info.title.clone(),
        description: info.description.clone(),
        duration: info.duration_seconds.to_string(),
        views: info.view_count.to_string(),
        channel: info.uploader.clone(),
        thumbnail: best_thumbnail(&info.thumbnails).map(|t| t.url.clone()),
        video_formats,
        audio_formats,
    }
}

fn quality_label(format: &ExtendedFormat) -> String {
    match (format.height, format.format_note.as_deref()) {
        (Some(height), _) => format!("{}p", height),
        (None, Some(note)) => note.to_string(),
        (None, None) => String::new(),
    }
}

/// Largest resolution wins, reported preference breaks ties.
fn best_thumbnail(thumbnails: &[Thumbnail]) -> Option<&Thumbnail> {
    let mut sorted: Vec<&Thumbnail> = thumbnails.iter().filter(|t| !t.url.is_empty()).collect();
    sorted.sort_by(|a, b| {
        b.pixel_area()
            .cmp(&a.pixel_area())
            .then_with(|| b.preference.unwrap_or(i64::MIN).cmp(&a.preference.unwrap_or(i64::MIN)))
    });
    sorted.into_iter().next()
}
