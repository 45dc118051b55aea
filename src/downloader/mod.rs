// Downloader module - URL validation, extraction, selection and transcoding

pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod history;
pub mod models;
pub mod orchestrator;
pub mod tools;
pub mod traits;
pub mod transcoder;
pub mod utils;
pub mod validation;
pub mod youtube_url;

pub use errors::{DownloadError, FieldError};
pub use extractors::{CliInfoExtractor, ExtractorConfig, InfoExtractor};
pub use history::{DownloadHistory, DownloadStats, MemoryDownloadHistory, NewDownload};
pub use models::{OutputFormat, VideoMetadata};
pub use orchestrator::{Downloader, PreparedDownload, ResolvedDownload};
pub use tools::{ToolInfo, ToolManager};
pub use traits::{ByteStream, Transcoder};
pub use transcoder::{ConversionOptions, FfmpegTranscoder};
