use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use youtube_clipper::api::{build_router, AppState};
use youtube_clipper::config::AppConfig;
use youtube_clipper::downloader::extractors::{ExtendedFormat, ExtendedVideoInfo, Thumbnail};
use youtube_clipper::downloader::history::{DownloadLogEntry, HistoryError};
use youtube_clipper::downloader::{
    ByteStream, ConversionOptions, DownloadError, DownloadHistory, DownloadStats, Downloader,
    InfoExtractor, MemoryDownloadHistory, NewDownload, Transcoder,
};

const LONG_VIDEO_ID: &str = "LongVideo01";
/// Source whose muxed variant only carries yt-dlp's size estimate
const APPROX_SIZE_ID: &str = "ApproxSize1";

#[derive(Default)]
struct FakeExtractor {
    extract_calls: AtomicUsize,
}

fn format(id: &str, ext: &str, height: Option<u32>, vcodec: &str, acodec: &str, abr: Option<f32>) -> ExtendedFormat {
    ExtendedFormat {
        format_id: id.to_string(),
        ext: ext.to_string(),
        height,
        vcodec: Some(vcodec.to_string()),
        acodec: Some(acodec.to_string()),
        filesize: Some(6),
        abr,
        url: Some(format!("https://media.test/{}", id)),
        ..Default::default()
    }
}

#[async_trait]
impl InfoExtractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn extract(&self, url: &str) -> Result<ExtendedVideoInfo, DownloadError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        let long = url.contains(LONG_VIDEO_ID);
        let mut muxed = format("18", "mp4", Some(360), "avc1.42001E", "mp4a.40.2", None);
        if url.contains(APPROX_SIZE_ID) {
            muxed.filesize = None;
            muxed.filesize_approx = Some(9_000_000);
        }
        Ok(ExtendedVideoInfo {
            id: if long { LONG_VIDEO_ID } else { "dQw4w9WgXcQ" }.to_string(),
            title: "Rick & Morty: S01E01!".to_string(),
            description: "A test video".to_string(),
            uploader: "Test Channel".to_string(),
            duration_seconds: if long { 601 } else { 213 },
            view_count: 1_000,
            thumbnails: vec![Thumbnail {
                url: "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg".to_string(),
                width: Some(1280),
                height: Some(720),
                preference: None,
            }],
            formats: vec![
                muxed,
                format("137", "mp4", Some(1080), "avc1.640028", "none", None),
                format("140", "m4a", None, "none", "mp4a.40.2", Some(129.0)),
                format("251", "webm", None, "none", "opus", Some(160.0)),
            ],
        })
    }

    async fn open_stream(&self, format: &ExtendedFormat) -> Result<ByteStream, DownloadError> {
        let body = Bytes::from(format!("raw:{}", format.format_id));
        Ok(futures::stream::once(async move { Ok(body) }).boxed())
    }
}

#[derive(Default)]
struct FakeTranscoder {
    calls: Mutex<Vec<ConversionOptions>>,
    fail_midstream: bool,
}

impl Transcoder for FakeTranscoder {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn transcode(&self, input: ByteStream, options: &ConversionOptions) -> Result<ByteStream, DownloadError> {
        self.calls.lock().push(options.clone());
        let prefix = futures::stream::once(async { Ok(Bytes::from_static(b"converted:")) });
        if self.fail_midstream {
            let failure = futures::stream::once(async {
                Err(std::io::Error::other("ffmpeg exited with status 1"))
            });
            return Ok(prefix.chain(failure).boxed());
        }
        Ok(prefix.chain(input).boxed())
    }
}

struct FailingHistory;

impl DownloadHistory for FailingHistory {
    fn record(&self, _download: NewDownload) -> Result<DownloadLogEntry, HistoryError> {
        Err(HistoryError::Unavailable("store offline".to_string()))
    }

    fn stats(&self) -> DownloadStats {
        DownloadStats::default()
    }
}

struct TestApp {
    router: Router,
    extractor: Arc<FakeExtractor>,
    transcoder: Arc<FakeTranscoder>,
}

fn app_with(history: Arc<dyn DownloadHistory>, transcoder: FakeTranscoder) -> TestApp {
    let extractor = Arc::new(FakeExtractor::default());
    let transcoder = Arc::new(transcoder);
    let downloader = Arc::new(Downloader::new(extractor.clone(), transcoder.clone()));
    let state = AppState::new(downloader, history);
    TestApp {
        router: build_router(state, &AppConfig::default()),
        extractor,
        transcoder,
    }
}

fn app() -> TestApp {
    app_with(Arc::new(MemoryDownloadHistory::new(10)), FakeTranscoder::default())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app().router.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn video_info_returns_metadata() {
    let response = app()
        .router
        .oneshot(post_json(
            "/api/video-info",
            json!({"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["videoId"], "dQw4w9WgXcQ");
    assert_eq!(json["duration"], "213");
    assert_eq!(json["channel"], "Test Channel");
    assert_eq!(json["videoFormats"].as_array().unwrap().len(), 1);
    assert_eq!(json["videoFormats"][0]["itag"], "18");
    assert_eq!(json["audioFormats"].as_array().unwrap().len(), 2);
    assert_eq!(
        json["thumbnail"],
        "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
    );
}

#[tokio::test]
async fn video_info_rejects_long_sources() {
    let response = app()
        .router
        .oneshot(post_json(
            "/api/video-info",
            json!({"url": format!("https://youtu.be/{}", LONG_VIDEO_ID)}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["message"],
        "Video is too long. Maximum duration allowed is 10 minutes."
    );
}

#[tokio::test]
async fn invalid_url_never_reaches_extractor() {
    let app = app();
    let response = app
        .router
        .oneshot(post_json(
            "/api/video-info",
            json!({"url": "https://vimeo.com/123456"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid YouTube URL");
    assert_eq!(app.extractor.extract_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mp3_download_streams_audio() {
    let app = app();
    let response = app
        .router
        .oneshot(post_json(
            "/api/download",
            json!({"url": "https://youtu.be/dQw4w9WgXcQ", "format": "mp3", "quality": "192kbps"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert_eq!(disposition, "attachment; filename=\"Rick_Morty_S01E01_.mp3\"");
    assert!(response.headers().get(header::CONTENT_LENGTH).is_none());

    // Highest-bitrate audio-only variant, routed through the transcoder
    assert_eq!(body_bytes(response).await, Bytes::from("converted:raw:251"));
    let calls = app.transcoder.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].audio_bitrate.as_deref(), Some("192k"));
    assert_eq!(calls[0].source_container.as_deref(), Some("webm"));
}

#[tokio::test]
async fn trimmed_download_passes_seek_and_duration() {
    let app = app();
    let response = app
        .router
        .oneshot(post_json(
            "/api/download",
            json!({"url": "https://youtu.be/dQw4w9WgXcQ", "format": "mp4", "startTime": 10, "endTime": 40}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let calls = app.transcoder.calls.lock();
    assert_eq!(calls[0].seek(), Some(10.0));
    assert_eq!(calls[0].duration(), Some(30.0));
}

#[tokio::test]
async fn untrimmed_same_container_streams_directly() {
    let app = app();
    let response = app
        .router
        .oneshot(post_json(
            "/api/download",
            json!({"url": "https://youtu.be/dQw4w9WgXcQ", "format": "mp4"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "6");
    assert_eq!(body_bytes(response).await, Bytes::from("raw:18"));
    assert!(app.transcoder.calls.lock().is_empty());
}

#[tokio::test]
async fn estimated_size_is_not_sent_as_content_length() {
    let app = app();
    let response = app
        .router
        .oneshot(post_json(
            "/api/download",
            json!({"url": format!("https://youtu.be/{}", APPROX_SIZE_ID), "format": "mp4"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
    assert_eq!(body_bytes(response).await, Bytes::from("raw:18"));
    assert!(app.transcoder.calls.lock().is_empty());
}

#[tokio::test]
async fn reversed_time_range_is_rejected() {
    for format in ["mp4", "mp3", "gif"] {
        let response = app()
            .router
            .oneshot(post_json(
                "/api/download",
                json!({"url": "https://youtu.be/dQw4w9WgXcQ", "format": format, "startTime": 60, "endTime": 30}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("End time must be greater than start time"));
        let errors = json["errors"].as_array().unwrap();
        assert!(errors.iter().any(|e| e["path"] == json!(["endTime"])));
    }
}

#[tokio::test]
async fn end_past_duration_is_rejected() {
    let response = app()
        .router
        .oneshot(post_json(
            "/api/download",
            json!({"url": "https://youtu.be/dQw4w9WgXcQ", "format": "mp3", "endTime": 300}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "End time cannot exceed video duration"
    );
}

#[tokio::test]
async fn download_rejects_long_sources() {
    let response = app()
        .router
        .oneshot(post_json(
            "/api/download",
            json!({"url": format!("https://www.youtube.com/watch?v={}", LONG_VIDEO_ID), "format": "mp3"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_container_names_format() {
    let response = app()
        .router
        .oneshot(post_json(
            "/api/download",
            json!({"url": "https://youtu.be/dQw4w9WgXcQ", "format": "webm"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "No suitable format found for webm highest"
    );
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/download")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app().router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid request data");
}

#[tokio::test]
async fn history_failure_does_not_block_download() {
    let app = app_with(Arc::new(FailingHistory), FakeTranscoder::default());
    let response = app
        .router
        .oneshot(post_json(
            "/api/download",
            json!({"url": "https://youtu.be/dQw4w9WgXcQ", "format": "wav"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
    assert_eq!(body_bytes(response).await, Bytes::from("converted:raw:251"));
}

#[tokio::test]
async fn transcoder_failure_after_headers_aborts_body() {
    let app = app_with(
        Arc::new(MemoryDownloadHistory::new(10)),
        FakeTranscoder {
            fail_midstream: true,
            ..Default::default()
        },
    );
    let response = app
        .router
        .oneshot(post_json(
            "/api/download",
            json!({"url": "https://youtu.be/dQw4w9WgXcQ", "format": "m4a"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .is_err());
}

#[tokio::test]
async fn stats_include_download_log() {
    let app = app();
    let router = app.router.clone();

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/download",
            json!({"url": "https://youtu.be/dQw4w9WgXcQ", "format": "mp3"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "running");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["downloads"]["totalDownloads"], 1);
    assert_eq!(json["downloads"]["byFormat"]["mp3"], 1);
    let recent = &json["downloads"]["recentDownloads"][0];
    assert_eq!(recent["videoId"], "dQw4w9WgXcQ");
    assert_eq!(recent["quality"], "default");
    assert_eq!(recent["userIp"], "unknown");
}
