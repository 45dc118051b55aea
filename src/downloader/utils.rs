// Helper functions shared by the extractor, transcoder and HTTP layer

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::errors::DownloadError;

lazy_static::lazy_static! {
    static ref UNSAFE_FILENAME_RE: Regex = Regex::new(r"[^A-Za-z0-9]+").unwrap();
    static ref BITRATE_RE: Regex = Regex::new(r"(?i)^\s*(\d{2,3})\s*k(?:bps|b/s|b)?\s*$").unwrap();
}

/// Run command with timeout, capturing stdout and stderr
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DownloadError::ToolNotFound(program.to_string()),
            _ => DownloadError::Io(e),
        })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::Stream(format!("Failed to capture stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::Stream(format!("Failed to capture stderr from {}", program)))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status) => {
            let status = status?;
            let stdout = stdout_task
                .await
                .map_err(|e| DownloadError::Stream(format!("stdout task failed: {}", e)))??;
            let stderr = stderr_task
                .await
                .map_err(|e| DownloadError::Stream(format!("stderr task failed: {}", e)))??;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::extraction(format!(
                "{} timed out after {}s",
                program, timeout_secs
            )))
        }
    }
}

/// Locate an executable: explicit override, common install locations, then PATH.
pub fn find_binary(binary_name: &str, override_path: Option<&str>) -> String {
    if let Some(path) = override_path.filter(|p| !p.trim().is_empty()) {
        return path.to_string();
    }

    let mut candidates: Vec<PathBuf> = vec![
        PathBuf::from(format!("/opt/homebrew/bin/{}", binary_name)), // Homebrew on Apple Silicon
        PathBuf::from(format!("/usr/local/bin/{}", binary_name)),
        PathBuf::from(format!("/usr/bin/{}", binary_name)),
    ];
    // pip --user installs
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".local/bin").join(binary_name));
    }

    for path in candidates {
        if path.exists() {
            debug!(binary = binary_name, path = %path.display(), "Found binary");
            return path.to_string_lossy().to_string();
        }
    }

    if let Ok(output) = std::process::Command::new("which").arg(binary_name).output() {
        if output.status.success() {
            let trimmed = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !trimmed.is_empty() && Path::new(&trimmed).exists() {
                return trimmed;
            }
        }
    }

    // Last resort: hope it's in PATH
    binary_name.to_string()
}

/// Make a title safe for a `Content-Disposition` filename.
///
/// Every run of characters outside `[A-Za-z0-9]` collapses to one `_`, so the
/// function is idempotent.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned = UNSAFE_FILENAME_RE.replace_all(title.trim(), "_").to_string();
    if cleaned.is_empty() || cleaned == "_" {
        "download".to_string()
    } else {
        cleaned
    }
}

/// Parse a quality hint like `"192kbps"` or `"320k"` into an ffmpeg bitrate (`"192k"`).
pub fn parse_audio_bitrate(hint: &str) -> Option<String> {
    BITRATE_RE
        .captures(hint)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|kbps| (32..=320).contains(kbps))
        .map(|kbps| format!("{}k", kbps))
}
