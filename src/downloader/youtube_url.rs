// YouTube URL validation
//
// Pure pattern check: no network access. Accepts
//   http(s)://[www.]youtube.com/watch?v=ID[&...]
//   http(s)://youtu.be/ID[?...]

use regex::Regex;

lazy_static::lazy_static! {
    static ref WATCH_RE: Regex = Regex::new(
        r"^https?://(?:www\.)?youtube\.com/watch\?v=([A-Za-z0-9_-]{11})(?:[&#].*)?$"
    ).unwrap();
    static ref SHORT_RE: Regex = Regex::new(
        r"^https?://youtu\.be/([A-Za-z0-9_-]{11})(?:[?#].*)?$"
    ).unwrap();
}

/// Extract the 11-character video id, or `None` if the input is not a
/// supported video URL.
pub fn extract_video_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    WATCH_RE
        .captures(trimmed)
        .or_else(|| SHORT_RE.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn is_valid_url(input: &str) -> bool {
    extract_video_id(input).is_some()
}
