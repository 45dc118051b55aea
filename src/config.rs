//! Service configuration loaded from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use crate::downloader::history::DEFAULT_CAPACITY;
use crate::downloader::ExtractorConfig;

/// Runtime configuration for the clipper service.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Directory served for every non-API path (the web client)
    pub static_dir: Option<PathBuf>,
    /// Enable permissive CORS
    pub enable_cors: bool,
    /// Entries kept by the in-memory download log
    pub history_capacity: usize,
    pub ytdlp_path: Option<String>,
    pub ffmpeg_path: Option<String>,
    /// Proxy for yt-dlp and variant fetches (http, https or socks5)
    pub proxy: Option<String>,
    pub cookies_path: Option<String>,
    pub extract_timeout_secs: u32,
    pub player_client: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: None,
            enable_cors: true,
            history_capacity: DEFAULT_CAPACITY,
            ytdlp_path: None,
            ffmpeg_path: None,
            proxy: None,
            cookies_path: None,
            extract_timeout_secs: 30,
            player_client: None,
        }
    }
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `CLIPPER_BIND_ADDRESS`, `CLIPPER_PORT`
    /// - `CLIPPER_STATIC_DIR`, `CLIPPER_ENABLE_CORS`
    /// - `CLIPPER_HISTORY_CAPACITY`
    /// - `YTDLP_PATH`, `FFMPEG_PATH`
    /// - `CLIPPER_PROXY`, `CLIPPER_COOKIES_PATH`
    /// - `CLIPPER_EXTRACT_TIMEOUT_SECS`, `CLIPPER_PLAYER_CLIENT`
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env_or_default`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            bind_address: text("CLIPPER_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: parse_or(&lookup, "CLIPPER_PORT", defaults.port),
            static_dir: text("CLIPPER_STATIC_DIR").map(PathBuf::from),
            enable_cors: parse_bool_or(&lookup, "CLIPPER_ENABLE_CORS", defaults.enable_cors),
            history_capacity: parse_or(&lookup, "CLIPPER_HISTORY_CAPACITY", defaults.history_capacity),
            ytdlp_path: text("YTDLP_PATH"),
            ffmpeg_path: text("FFMPEG_PATH"),
            proxy: text("CLIPPER_PROXY"),
            cookies_path: text("CLIPPER_COOKIES_PATH"),
            extract_timeout_secs: parse_or(
                &lookup,
                "CLIPPER_EXTRACT_TIMEOUT_SECS",
                defaults.extract_timeout_secs,
            ),
            player_client: text("CLIPPER_PLAYER_CLIENT"),
        }
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig::default()
            .with_ytdlp_path(self.ytdlp_path.clone())
            .with_proxy(self.proxy.clone())
            .with_cookies_path(self.cookies_path.clone())
            .with_timeout(self.extract_timeout_secs)
            .with_player_client(self.player_client.clone())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "Invalid config value, using default");
                default
            }
        },
        _ => default,
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => default,
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        Some(other) => {
            warn!(key, value = other, "Invalid boolean config value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[]);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert!(config.enable_cors);
        assert_eq!(config.history_capacity, 1000);
    }

    #[test]
    fn test_config_overrides() {
        let config = load(&[
            ("CLIPPER_PORT", "8080"),
            ("CLIPPER_ENABLE_CORS", "false"),
            ("CLIPPER_STATIC_DIR", "./dist/public"),
            ("CLIPPER_PROXY", "socks5://127.0.0.1:1080"),
            ("FFMPEG_PATH", "/opt/ffmpeg/bin/ffmpeg"),
            ("CLIPPER_EXTRACT_TIMEOUT_SECS", "45"),
        ]);
        assert_eq!(config.port, 8080);
        assert!(!config.enable_cors);
        assert_eq!(config.static_dir, Some(PathBuf::from("./dist/public")));
        assert_eq!(config.ffmpeg_path.as_deref(), Some("/opt/ffmpeg/bin/ffmpeg"));

        let extractor = config.extractor_config();
        assert_eq!(extractor.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(extractor.timeout_seconds, 45);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = load(&[
            ("CLIPPER_PORT", "not-a-port"),
            ("CLIPPER_ENABLE_CORS", "maybe"),
            ("CLIPPER_HISTORY_CAPACITY", "-3"),
            ("CLIPPER_BIND_ADDRESS", "   "),
        ]);
        assert_eq!(config.port, 5000);
        assert!(config.enable_cors);
        assert_eq!(config.history_capacity, 1000);
        assert_eq!(config.bind_address, "0.0.0.0");
    }
}
