// CLI InfoExtractor - uses native `yt-dlp` binary
//
// Metadata comes from `yt-dlp --dump-json`. Media bytes are fetched straight
// from the format URL yt-dlp resolved, in ranged chunks so YouTube does not
// throttle the connection.

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RANGE};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::traits::{ExtendedFormat, ExtendedVideoInfo, ExtractorConfig, InfoExtractor, Thumbnail};
use crate::downloader::errors::DownloadError;
use crate::downloader::traits::ByteStream;
use crate::downloader::utils::{find_binary, run_output_with_timeout};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Size of one ranged request against the media URL
const HTTP_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// CLI-based info extractor using yt-dlp binary
pub struct CliInfoExtractor {
    ytdlp_path: String,
    config: ExtractorConfig,
    client: reqwest::Client,
}

impl CliInfoExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let ytdlp_path = find_binary("yt-dlp", config.ytdlp_path.as_deref());
        let client = Self::build_client(config.proxy.as_deref());
        Self {
            ytdlp_path,
            config,
            client,
        }
    }

    pub fn ytdlp_path(&self) -> &str {
        &self.ytdlp_path
    }

    /// Streaming client: no overall timeout, long transfers are expected.
    fn build_client(proxy: Option<&str>) -> reqwest::Client {
        let builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .tcp_nodelay(true)
            .user_agent(USER_AGENT);

        let builder = match proxy.map(reqwest::Proxy::all) {
            Some(Ok(proxy)) => builder.proxy(proxy),
            Some(Err(e)) => {
                warn!(error = %e, "Invalid proxy URL, streaming without proxy");
                builder
            }
            None => builder,
        };

        builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build stream client, using defaults");
            reqwest::Client::new()
        })
    }

    /// Build command arguments
    fn build_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.timeout_seconds.to_string(),
            "--user-agent".to_string(),
            USER_AGENT.to_string(),
        ];

        if let Some(client) = &self.config.player_client {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:player_client={}", client));
        }

        if let Some(path) = &self.config.cookies_path {
            args.push("--cookies".to_string());
            args.push(path.clone());
        }

        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Parse `--dump-json` output
    pub fn parse_json(stdout: &[u8]) -> Result<ExtendedVideoInfo, DownloadError> {
        let json: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

        let formats = Self::parse_formats(&json)?;

        // Rounded up so fractional sources cannot slip under the length limit
        let duration_seconds = json["duration"]
            .as_f64()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.ceil() as u64)
            .ok_or_else(|| DownloadError::ParseError("No duration in JSON".to_string()))?;

        let mut thumbnails: Vec<Thumbnail> = json["thumbnails"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|t| {
                        Some(Thumbnail {
                            url: t["url"].as_str()?.to_string(),
                            width: t["width"].as_u64().map(|w| w as u32),
                            height: t["height"].as_u64().map(|h| h as u32),
                            preference: t["preference"].as_i64(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        if thumbnails.is_empty() {
            if let Some(url) = json["thumbnail"].as_str() {
                thumbnails.push(Thumbnail {
                    url: url.to_string(),
                    ..Default::default()
                });
            }
        }

        Ok(ExtendedVideoInfo {
            id: json["id"].as_str().unwrap_or("unknown").to_string(),
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            description: json["description"].as_str().unwrap_or("").to_string(),
            uploader: json["channel"]
                .as_str()
                .or_else(|| json["uploader"].as_str())
                .unwrap_or("Unknown")
                .to_string(),
            duration_seconds,
            view_count: json["view_count"].as_u64().unwrap_or(0),
            thumbnails,
            formats,
        })
    }

    fn parse_formats(json: &serde_json::Value) -> Result<Vec<ExtendedFormat>, DownloadError> {
        let formats_array = json["formats"]
            .as_array()
            .ok_or_else(|| DownloadError::ParseError("No formats array in JSON".to_string()))?;

        let formats = formats_array
            .iter()
            .map(|f| {
                let http_headers: HashMap<String, String> = f["http_headers"]
                    .as_object()
                    .map(|headers| {
                        headers
                            .iter()
                            .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                            .collect()
                    })
                    .unwrap_or_default();

                ExtendedFormat {
                    format_id: f["format_id"].as_str().unwrap_or("").to_string(),
                    ext: f["ext"].as_str().unwrap_or("").to_string(),
                    height: f["height"].as_u64().map(|h| h as u32),
                    vcodec: f["vcodec"].as_str().map(|s| s.to_string()),
                    acodec: f["acodec"].as_str().map(|s| s.to_string()),
                    filesize: f["filesize"].as_u64(),
                    filesize_approx: f["filesize_approx"].as_u64(),
                    abr: f["abr"].as_f64().map(|a| a as f32),
                    format_note: f["format_note"].as_str().map(|s| s.to_string()),
                    url: f["url"].as_str().map(|s| s.to_string()),
                    http_headers,
                }
            })
            // Storyboards and manifests carry neither track
            .filter(|f| f.has_audio() || f.has_video())
            .collect();

        Ok(formats)
    }

    fn build_headers(format: &ExtendedFormat) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in &format.http_headers {
            match (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => debug!(header = %k, "Skipping malformed header from yt-dlp"),
            }
        }
        headers
    }

    /// Split a known size into inclusive byte ranges; unknown sizes use one plain request.
    fn plan_ranges(size: Option<u64>) -> Vec<Option<(u64, u64)>> {
        match size {
            Some(total) if total > 0 => (0..total)
                .step_by(HTTP_CHUNK_SIZE as usize)
                .map(|start| Some((start, (start + HTTP_CHUNK_SIZE).min(total) - 1)))
                .collect(),
            _ => vec![None],
        }
    }

    async fn fetch_range(
        client: &reqwest::Client,
        url: &str,
        headers: &HeaderMap,
        range: Option<(u64, u64)>,
    ) -> Result<ByteStream, DownloadError> {
        let mut request = client.get(url).headers(headers.clone());
        if let Some((start, end)) = range {
            request = request.header(RANGE, format!("bytes={}-{}", start, end));
        }

        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::Stream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DownloadError::Stream(format!(
                "Upstream responded with {}",
                response.status()
            )));
        }

        Ok(response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }
}

#[async_trait]
impl InfoExtractor for CliInfoExtractor {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    async fn extract(&self, url: &str) -> Result<ExtendedVideoInfo, DownloadError> {
        let args = self.build_args(url);
        debug!(program = %self.ytdlp_path, args = %args.join(" "), "Running extractor");

        let output = run_output_with_timeout(
            &self.ytdlp_path,
            args,
            self.config.timeout_seconds as u64,
        )
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DownloadError::extraction(stderr));
        }

        let info = Self::parse_json(&output.stdout)?;
        info!(
            video_id = %info.id,
            formats = info.formats.len(),
            "Extracted video info"
        );
        Ok(info)
    }

    async fn open_stream(&self, format: &ExtendedFormat) -> Result<ByteStream, DownloadError> {
        let url = format
            .url
            .clone()
            .ok_or_else(|| DownloadError::Stream(format!("Format {} has no URL", format.format_id)))?;
        let headers = Self::build_headers(format);

        // Only exact sizes are safe to range over
        let mut ranges = Self::plan_ranges(format.filesize).into_iter();
        let first_range = ranges.next().flatten();

        // First chunk is requested eagerly so connection failures surface
        // before any response headers go out.
        let first = Self::fetch_range(&self.client, &url, &headers, first_range).await?;

        let client = self.client.clone();
        let rest = stream::iter(ranges)
            .then(move |range| {
                let client = client.clone();
                let url = url.clone();
                let headers = headers.clone();
                async move {
                    Self::fetch_range(&client, &url, &headers, range)
                        .await
                        .map_err(|e| std::io::Error::other(e.to_string()))
                }
            })
            .try_flatten();

        Ok(first.chain(rest).boxed())
    }
}
