// InfoExtractor module - video info extraction and raw stream access
//
// The extraction tool is a black box behind the `InfoExtractor` trait:
// `CliInfoExtractor` drives the native yt-dlp binary, tests substitute
// fixtures.

mod cli;
mod diagnostics;
mod traits;

pub use cli::CliInfoExtractor;
pub use diagnostics::{diagnose_error, BlockingReason};
pub use traits::{ExtendedFormat, ExtendedVideoInfo, ExtractorConfig, InfoExtractor, Thumbnail};
