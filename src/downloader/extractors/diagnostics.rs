// Extraction failure diagnostics
//
// yt-dlp reports every failure as free text on stderr. The classification
// here only feeds server-side logs; clients always get a generic message.

use serde::Serialize;
use std::fmt;

/// Why YouTube refused or failed an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingReason {
    /// DRM-protected, premium or paid content
    DrmProtected,
    MembersOnly,
    /// SABR streaming / PO token gating of formats
    FormatGating,
    AgeRestricted,
    PrivateVideo,
    VideoUnavailable,
    GeoBlocked,
    RateLimited,
    BotDetection,
    Http403Forbidden,
    NetworkTimeout,
    Unknown,
}

impl BlockingReason {
    /// Retrying the same source will not help
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::DrmProtected | Self::VideoUnavailable | Self::PrivateVideo
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::DrmProtected => "DRM-protected content",
            Self::MembersOnly => "Members-only content",
            Self::FormatGating => "Formats gated by SABR/PO token",
            Self::AgeRestricted => "Age-restricted content",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::RateLimited => "Rate limited by YouTube",
            Self::BotDetection => "Bot detection triggered",
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::NetworkTimeout => "Network timeout",
            Self::Unknown => "Unknown failure",
        }
    }
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Checked in order; the first reason with a matching needle wins.
const PATTERNS: &[(BlockingReason, &[&str])] = &[
    (
        BlockingReason::DrmProtected,
        &["drm", "widevine", "playready", "fairplay", "youtube premium", "requires purchase", "rental"],
    ),
    (
        BlockingReason::MembersOnly,
        &["members only", "members-only", "join this channel", "available to members"],
    ),
    (
        BlockingReason::FormatGating,
        &["sabr", "po token", "proof of origin"],
    ),
    (
        BlockingReason::AgeRestricted,
        &["age-restricted", "confirm your age"],
    ),
    (
        BlockingReason::PrivateVideo,
        &["private video", "video is private"],
    ),
    (
        BlockingReason::VideoUnavailable,
        &["video unavailable", "has been removed", "no longer available"],
    ),
    (
        BlockingReason::GeoBlocked,
        &["available in your country", "blocked in your country", "geo restrict"],
    ),
    (
        BlockingReason::RateLimited,
        &["429", "rate limit", "too many requests"],
    ),
    (
        BlockingReason::BotDetection,
        &["not a bot", "captcha", "unusual traffic"],
    ),
    (BlockingReason::Http403Forbidden, &["403", "forbidden"]),
    (
        BlockingReason::NetworkTimeout,
        &["timed out", "timeout", "connection refused", "network unreachable"],
    ),
];

/// Classify a tool error message. Empty input yields `None`.
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    if error.trim().is_empty() {
        return None;
    }
    let lower = error.to_lowercase();
    let reason = PATTERNS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(reason, _)| *reason)
        .unwrap_or(BlockingReason::Unknown);
    Some(reason)
}
