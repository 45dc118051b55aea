//! Video metadata and download routes.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::Response,
    routing::post,
    Extension, Json, Router,
};
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::downloader::validation::{DownloadRequestBody, VideoInfoBody};
use crate::downloader::{NewDownload, VideoMetadata};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/video-info", post(video_info))
        .route("/download", post(download))
}

/// `POST /api/video-info`
async fn video_info(
    State(state): State<AppState>,
    payload: Result<Json<VideoInfoBody>, JsonRejection>,
) -> ApiResult<Json<VideoMetadata>> {
    let Json(body) = payload.map_err(reject_body)?;
    let url = body.validate()?;
    let metadata = state.downloader.fetch_metadata(&url).await?;
    Ok(Json(metadata))
}

/// `POST /api/download`
///
/// Every check runs before the first header is written; once the body
/// starts streaming, failures can only abort the connection.
async fn download(
    State(state): State<AppState>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
    payload: Result<Json<DownloadRequestBody>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload.map_err(reject_body)?;
    let request = body.validate()?;
    let resolved = state.downloader.resolve(request).await?;

    let user_ip = client_ip(&headers, connect_info.map(|Extension(ConnectInfo(addr))| addr));
    let logged = state.history.record(NewDownload {
        video_id: resolved.metadata.video_id.clone(),
        title: resolved.metadata.title.clone(),
        format: resolved.request.format.to_string(),
        quality: resolved.request.quality.clone(),
        user_ip,
    });
    if let Err(e) = logged {
        warn!(video_id = %resolved.metadata.video_id, error = %e, "Failed to log download");
    }

    let prepared = state.downloader.open(&resolved).await?;

    info!(
        video_id = %resolved.metadata.video_id,
        format = %resolved.request.format,
        transcoded = prepared.transcoded,
        "Streaming download"
    );

    let mut response = Response::new(Body::from_stream(prepared.stream));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(prepared.content_type));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", prepared.filename))
            .map_err(|_| ApiError::internal("Failed to build download headers"))?,
    );
    if let Some(length) = prepared.content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    Ok(response)
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    tracing::debug!("Rejected request body: {}", rejection.body_text());
    ApiError::bad_request("Invalid request data")
}

/// First `X-Forwarded-For` hop, then the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
