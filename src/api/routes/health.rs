//! Health and stats routes.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};
use time::OffsetDateTime;

use crate::api::server::AppState;
use crate::downloader::{DownloadStats, ToolInfo};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(stats))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Resident and virtual memory of this process, in bytes
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub uptime_secs: u64,
    pub memory: MemoryUsage,
    pub version: &'static str,
    pub tools: Vec<ToolInfo>,
    pub downloads: DownloadStats,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: OffsetDateTime::now_utc(),
    })
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        status: "running",
        timestamp: OffsetDateTime::now_utc(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        memory: process_memory(),
        version: env!("CARGO_PKG_VERSION"),
        tools: state.tools.as_ref().clone(),
        downloads: state.history.stats(),
    })
}

fn process_memory() -> MemoryUsage {
    let pid = match sysinfo::get_current_pid() {
        Ok(pid) => pid,
        Err(e) => {
            tracing::debug!("Cannot resolve own pid: {}", e);
            return MemoryUsage::default();
        }
    };

    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system
        .process(pid)
        .map(|p| MemoryUsage {
            resident_bytes: p.memory(),
            virtual_bytes: p.virtual_memory(),
        })
        .unwrap_or_default()
}
