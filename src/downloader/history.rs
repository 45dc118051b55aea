// Download history - best-effort, in-memory log of started downloads
//
// Entries are volatile and bounded: the oldest entry is evicted once the ring
// buffer is full. Counters keep counting past evictions.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Entries shown in `recentDownloads`
pub const RECENT_LIMIT: usize = 10;

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Download history unavailable: {0}")]
    Unavailable(String),
}

/// Fields supplied by the download endpoint
#[derive(Debug, Clone)]
pub struct NewDownload {
    pub video_id: String,
    pub title: String,
    pub format: String,
    pub quality: Option<String>,
    pub user_ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLogEntry {
    pub id: Uuid,
    pub video_id: String,
    pub title: String,
    pub format: String,
    pub quality: String,
    pub user_ip: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStats {
    /// Downloads recorded since startup, including evicted ones
    pub total_downloads: u64,
    /// Entries currently held in memory
    pub retained: usize,
    pub by_format: BTreeMap<String, u64>,
    /// Newest first
    pub recent_downloads: Vec<DownloadLogEntry>,
}

/// Store for download log entries
pub trait DownloadHistory: Send + Sync {
    fn record(&self, download: NewDownload) -> Result<DownloadLogEntry, HistoryError>;

    fn stats(&self) -> DownloadStats;
}

#[derive(Default)]
struct HistoryInner {
    entries: VecDeque<DownloadLogEntry>,
    total: u64,
    by_format: BTreeMap<String, u64>,
}

/// Bounded ring buffer owned by the application state
pub struct MemoryDownloadHistory {
    capacity: usize,
    inner: Mutex<HistoryInner>,
}

impl MemoryDownloadHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(HistoryInner {
                entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
                ..Default::default()
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MemoryDownloadHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DownloadHistory for MemoryDownloadHistory {
    fn record(&self, download: NewDownload) -> Result<DownloadLogEntry, HistoryError> {
        let entry = DownloadLogEntry {
            id: Uuid::new_v4(),
            video_id: download.video_id,
            title: download.title,
            format: download.format,
            quality: download.quality.unwrap_or_else(|| "default".to_string()),
            user_ip: download.user_ip,
            timestamp: OffsetDateTime::now_utc(),
        };

        let mut inner = self.inner.lock();
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(entry.clone());
        inner.total += 1;
        *inner.by_format.entry(entry.format.clone()).or_insert(0) += 1;

        Ok(entry)
    }

    fn stats(&self) -> DownloadStats {
        let inner = self.inner.lock();
        DownloadStats {
            total_downloads: inner.total,
            retained: inner.entries.len(),
            by_format: inner.by_format.clone(),
            recent_downloads: inner.entries.iter().rev().take(RECENT_LIMIT).cloned().collect(),
        }
    }
}
