// FormatSelector - picks the variant a download is served from
//
// Audio targets take the best audio-only variant regardless of the hint.
// Video targets need a muxed (audio + video) variant in the requested
// container; the hint picks among those, otherwise the best one wins.

use super::errors::DownloadError;
use super::models::{AudioVariant, OutputFormat, SelectedVariant, VideoMetadata, VideoVariant};

/// Hints that mean "no preference"
const NEUTRAL_HINTS: &[&str] = &["highest", "highestvideo", "highestaudio", "best"];

pub struct FormatSelector;

impl FormatSelector {
    /// Choose one variant of `metadata` for the requested output.
    pub fn select(
        metadata: &VideoMetadata,
        format: OutputFormat,
        quality: Option<&str>,
    ) -> Result<SelectedVariant, DownloadError> {
        let hint = Self::normalize_hint(quality);

        let selected = if format.is_audio_only() {
            Self::best_audio(&metadata.audio_formats).map(|a| SelectedVariant::Audio(a.clone()))
        } else {
            let candidates: Vec<&VideoVariant> = metadata
                .video_formats
                .iter()
                .filter(|v| v.has_audio && v.has_video)
                .filter(|v| v.container.eq_ignore_ascii_case(format.as_str()))
                .collect();

            hint.as_deref()
                .and_then(|h| Self::find_by_hint(&candidates, h))
                .or_else(|| Self::best_video(&candidates))
                .map(|v| SelectedVariant::Video(v.clone()))
        };

        selected.ok_or_else(|| Self::no_match(format, quality))
    }

    /// Error for a request no variant can serve.
    pub fn no_match(format: OutputFormat, quality: Option<&str>) -> DownloadError {
        DownloadError::NoMatchingFormat {
            format: format.to_string(),
            quality: quality
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .unwrap_or(if format.is_audio_only() { "default" } else { "highest" })
                .to_string(),
        }
    }

    fn normalize_hint(quality: Option<&str>) -> Option<String> {
        let hint = quality?.trim().to_ascii_lowercase();
        if hint.is_empty() || NEUTRAL_HINTS.contains(&hint.as_str()) {
            None
        } else {
            Some(hint)
        }
    }

    /// Match on the human label ("720p") or the quality bucket ("hd720").
    fn find_by_hint<'a>(candidates: &[&'a VideoVariant], hint: &str) -> Option<&'a VideoVariant> {
        let matches: Vec<&'a VideoVariant> = candidates
            .iter()
            .copied()
            .filter(|v| {
                v.quality_label.eq_ignore_ascii_case(hint) || v.quality.as_str() == hint
            })
            .collect();
        Self::best_video(&matches)
    }

    fn best_video<'a>(candidates: &[&'a VideoVariant]) -> Option<&'a VideoVariant> {
        candidates
            .iter()
            .max_by_key(|v| (v.quality, v.content_length.unwrap_or(0)))
            .copied()
    }

    fn best_audio(variants: &[AudioVariant]) -> Option<&AudioVariant> {
        variants
            .iter()
            .max_by_key(|a| (a.audio_bitrate.unwrap_or(0), a.content_length.unwrap_or(0)))
    }
}
