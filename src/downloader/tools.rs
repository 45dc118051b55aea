// External tool discovery: yt-dlp and ffmpeg

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use super::utils::{find_binary, run_output_with_timeout};

const VERSION_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // single dash
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

/// Resolves tool paths, honouring configured overrides
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    ytdlp_override: Option<String>,
    ffmpeg_override: Option<String>,
}

impl ToolManager {
    pub fn new(ytdlp_override: Option<String>, ffmpeg_override: Option<String>) -> Self {
        Self {
            ytdlp_override,
            ffmpeg_override,
        }
    }

    pub fn binary_path(&self, tool_type: ToolType) -> String {
        let override_path = match tool_type {
            ToolType::YtDlp => self.ytdlp_override.as_deref(),
            ToolType::Ffmpeg => self.ffmpeg_override.as_deref(),
        };
        find_binary(tool_type.as_str(), override_path)
    }

    pub async fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.binary_path(tool_type);
        let version = self.get_version(&path, tool_type).await;
        // A bare name means discovery fell through to PATH lookup
        let is_available =
            version.is_some() || (Path::new(&path).is_absolute() && Path::new(&path).exists());

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            path: is_available.then_some(path),
            is_available,
        }
    }

    pub async fn get_all_tools(&self) -> Vec<ToolInfo> {
        let (ytdlp, ffmpeg) = tokio::join!(
            self.get_tool_info(ToolType::YtDlp),
            self.get_tool_info(ToolType::Ffmpeg)
        );
        vec![ytdlp, ffmpeg]
    }

    /// Detect both tools and log what was found.
    pub async fn detect_and_log(&self) -> Vec<ToolInfo> {
        let tools = self.get_all_tools().await;
        for tool in &tools {
            match (&tool.version, &tool.path) {
                (Some(version), Some(path)) => {
                    info!(tool = %tool.name, version = %version, path = %path, "Found tool")
                }
                _ => warn!(tool = %tool.name, "Tool not available, requests needing it will fail"),
            }
        }
        tools
    }

    async fn get_version(&self, path: &str, tool_type: ToolType) -> Option<String> {
        let output = run_output_with_timeout(
            path,
            vec![tool_type.version_arg().to_string()],
            VERSION_TIMEOUT_SECS,
        )
        .await
        .ok()?;

        if !output.status.success() {
            return None;
        }
        parse_version(tool_type, &String::from_utf8_lossy(&output.stdout))
    }
}

/// Pull the version out of a tool's version banner.
pub fn parse_version(tool_type: ToolType, stdout: &str) -> Option<String> {
    let first_line = stdout.lines().next()?.trim();
    match tool_type {
        ToolType::YtDlp => Some(first_line.to_string()).filter(|v| !v.is_empty()),
        // "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023 ..."
        ToolType::Ffmpeg => first_line
            .strip_prefix("ffmpeg version ")
            .and_then(|rest| rest.split_whitespace().next())
            .map(String::from),
    }
}
