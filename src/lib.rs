pub mod api;
pub mod config;
pub mod downloader;
pub mod logging;

use std::sync::Arc;

use api::AppState;
use config::AppConfig;
use downloader::{CliInfoExtractor, Downloader, FfmpegTranscoder, MemoryDownloadHistory, ToolManager};

/// Wire the production extractor, transcoder and history into application state.
pub async fn build_state(config: &AppConfig) -> AppState {
    let tools = ToolManager::new(config.ytdlp_path.clone(), config.ffmpeg_path.clone())
        .detect_and_log()
        .await;

    let extractor = Arc::new(CliInfoExtractor::new(config.extractor_config()));
    let transcoder = Arc::new(FfmpegTranscoder::new(config.ffmpeg_path.as_deref()));
    let downloader = Arc::new(Downloader::new(extractor, transcoder));
    let history = Arc::new(MemoryDownloadHistory::new(config.history_capacity));

    AppState::new(downloader, history).with_tools(tools)
}
