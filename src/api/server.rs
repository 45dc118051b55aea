//! API server setup and shared state.

use axum::extract::Request;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::routes;
use crate::config::AppConfig;
use crate::downloader::{DownloadHistory, Downloader, ToolInfo};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    pub downloader: Arc<Downloader>,
    /// Download log, owned here rather than as a global
    pub history: Arc<dyn DownloadHistory>,
    /// Tool versions detected at startup
    pub tools: Arc<Vec<ToolInfo>>,
}

impl AppState {
    pub fn new(downloader: Arc<Downloader>, history: Arc<dyn DownloadHistory>) -> Self {
        Self {
            start_time: Instant::now(),
            downloader,
            history,
            tools: Arc::new(Vec::new()),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolInfo>) -> Self {
        self.tools = Arc::new(tools);
        self
    }
}

/// Build the router with all middleware and routes.
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let mut router = routes::create_router(state);

    if let Some(dir) = &config.static_dir {
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any);
        router = router.layer(cors);
    }

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request| {
                if req.uri().path().starts_with("/api/health") {
                    Span::none()
                } else {
                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        path = %req.uri().path(),
                    )
                }
            })
            .on_response(
                |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                    if span.is_disabled() {
                        return;
                    }
                    tracing::info!(
                        status = res.status().as_u16(),
                        latency_ms = latency.as_millis() as u64,
                        "Response sent"
                    );
                },
            ),
    )
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &AppConfig, state: AppState) -> std::io::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid address: {}", e),
            )
        })?;

    let router = build_router(state, config);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
