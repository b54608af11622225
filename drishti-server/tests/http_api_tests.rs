// HTTP API tests against the router with a stub detector

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use drishti_core::{ArtifactStore, NetworkConfig};
use drishti_eye::processing::encode_jpeg;
use drishti_eye::{
    BoundingBox, Detection, Detector, Frame, FrameRatePolicy, FrameSink, FrameSize, PipelineConfig, VideoFileSink,
    VisionError,
};
use drishti_server::http::{create_router, ApiState};
use drishti_server::metrics::JobMetrics;
use opencv::core::{Mat, Scalar, CV_8UC3};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "drishti-test-boundary";

/// Reports one dog in every frame
struct StubDetector;

impl Detector for StubDetector {
    fn name(&self) -> &str {
        "stub"
    }

    fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        Ok(vec![Detection {
            class_id: 16,
            class_name: "dog".to_string(),
            confidence: 0.8,
            bbox: BoundingBox::new(8.0, 8.0, 32.0, 24.0),
        }])
    }
}

struct TestApp {
    router: Router,
    dir: TempDir,
}

fn test_app_with(network: NetworkConfig, pipeline: PipelineConfig) -> TestApp {
    let dir = TempDir::new().unwrap();
    let artifacts = ArtifactStore::new(dir.path().join("results"));
    artifacts.ensure_layout().unwrap();

    let state = ApiState {
        detector: Arc::new(StubDetector),
        artifacts: Arc::new(artifacts),
        pipeline,
        metrics: Arc::new(JobMetrics::new()),
    };
    TestApp {
        router: create_router(state, &network),
        dir,
    }
}

fn test_app() -> TestApp {
    test_app_with(NetworkConfig::default(), PipelineConfig::default())
}

fn sample_jpeg() -> Vec<u8> {
    let frame = Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::new(40.0, 90.0, 140.0, 0.0)).unwrap();
    encode_jpeg(&frame).unwrap()
}

/// Motion JPEG clip of `frames` solid frames, as uploaded bytes
fn sample_clip(frames: usize) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clip.avi");
    let mut sink = VideoFileSink::open(&path, FrameSize::new(64, 48), 15.0, ['M', 'J', 'P', 'G']).unwrap();
    for i in 0..frames {
        let frame = Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::all((i * 30) as f64)).unwrap();
        sink.append(&frame).unwrap();
    }
    sink.close().unwrap();
    std::fs::read(&path).unwrap()
}

fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, field, filename, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}

fn files_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// First `/results/...` URL in a page
fn result_url(html: &str, subfolder: &str) -> String {
    let prefix = format!("/results/{}/", subfolder);
    let start = html.find(&prefix).unwrap();
    let end = html[start..].find('"').unwrap();
    html[start..start + end].to_string()
}

#[tokio::test]
async fn test_index_page() {
    let app = test_app();
    let response = app.router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("/upload_image"));
    assert!(html.contains("/upload_video"));
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let response = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["detector"], "stub");
}

#[tokio::test]
async fn test_download_missing_file() {
    let app = test_app();
    let response = app
        .router
        .oneshot(get("/download/videos/result_video.mp4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("File result_video.mp4 not found"));
}

#[tokio::test]
async fn test_download_unknown_subfolder() {
    let app = test_app();
    let response = app.router.oneshot(get("/download/uploads/anything.mp4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let app = test_app();
    let response = app
        .router
        .oneshot(get("/download/images/..%2F..%2Fsecret.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_image_round_trip() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(upload("/upload_image", multipart_body("file", "dog.jpg", "image/jpeg", &sample_jpeg())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("dog"));
    let image_url = result_url(&html, "images");
    assert!(image_url.ends_with(".jpg"));
    assert!(html.contains(&image_url.replace("/results/", "/download/")));

    let response = app.router.clone().oneshot(get(&image_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");

    let download_url = image_url.replace("/results/", "/download/");
    let response = app.router.oneshot(get(&download_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_two_image_uploads_keep_separate_results() {
    let app = test_app();
    let mut urls = Vec::new();
    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(upload("/upload_image", multipart_body("file", "dog.jpg", "image/jpeg", &sample_jpeg())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        urls.push(result_url(&body_text(response).await, "images"));
    }
    assert_ne!(urls[0], urls[1]);
    assert_eq!(files_in(&app.dir.path().join("results/images")), 2);
}

#[tokio::test]
async fn test_upload_image_garbage() {
    let app = test_app();
    let response = app
        .router
        .oneshot(upload("/upload_image", multipart_body("file", "x.jpg", "image/jpeg", b"not an image")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(files_in(&app.dir.path().join("results/images")), 0);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = test_app();
    let response = app
        .router
        .oneshot(upload("/upload_image", multipart_body("picture", "x.jpg", "image/jpeg", &sample_jpeg())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_video_round_trip() {
    let app = test_app_with(
        NetworkConfig::default(),
        PipelineConfig {
            frame_rate: FrameRatePolicy::Fixed(10.0),
            ..PipelineConfig::default()
        },
    );
    let response = app
        .router
        .clone()
        .oneshot(upload(
            "/upload_video",
            multipart_body("file", "clip.avi", "video/x-msvideo", &sample_clip(4)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    let video_url = result_url(&html, "videos");
    assert!(video_url.ends_with(".mp4"));
    let download_url = video_url.replace("/results/", "/download/");
    assert!(html.contains(&download_url));
    assert!(html.contains("4 frames"));

    let response = app.router.clone().oneshot(get(&video_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert!(!body_text(response).await.is_empty());

    let response = app.router.clone().oneshot(get(&download_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment"));

    // Only the annotated video remains; the raw upload is gone
    assert_eq!(files_in(&app.dir.path().join("results/videos")), 1);
    assert_eq!(files_in(&app.dir.path().join("results/uploads")), 0);

    let response = app.router.oneshot(get("/metrics")).await.unwrap();
    let text = body_text(response).await;
    assert!(text.contains("drishti_jobs_total{kind=\"video\",outcome=\"succeeded\"} 1"));
}

#[tokio::test]
async fn test_upload_video_unreadable() {
    let app = test_app();
    let response = app
        .router
        .oneshot(upload(
            "/upload_video",
            multipart_body("file", "clip.mp4", "video/mp4", b"this is not a video container"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("Cannot open the uploaded file"));

    // Neither a result nor the raw upload is left behind
    assert_eq!(files_in(&app.dir.path().join("results/videos")), 0);
    assert_eq!(files_in(&app.dir.path().join("results/uploads")), 0);
}

#[tokio::test]
async fn test_detect_api_returns_json() {
    let app = test_app();
    let response = app
        .router
        .oneshot(upload("/api/v1/detect", multipart_body("file", "dog.jpg", "image/jpeg", &sample_jpeg())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["width"], 64);
    assert_eq!(json["height"], 48);
    assert_eq!(json["detections"][0]["class_name"], "dog");
}

#[tokio::test]
async fn test_detect_api_error_is_json() {
    let app = test_app();
    let response = app
        .router
        .oneshot(upload("/api/v1/detect", multipart_body("file", "x.png", "image/png", b"")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["code"], "UNREADABLE_MEDIA");
}

#[tokio::test]
async fn test_upload_limit() {
    let app = test_app_with(
        NetworkConfig {
            max_upload_bytes: Some(64),
            ..NetworkConfig::default()
        },
        PipelineConfig::default(),
    );
    let response = app
        .router
        .oneshot(upload("/upload_image", multipart_body("file", "dog.jpg", "image/jpeg", &sample_jpeg())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_metrics_count_jobs() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(upload("/upload_image", multipart_body("file", "dog.jpg", "image/jpeg", &sample_jpeg())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.router.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("drishti_jobs_total{kind=\"image\",outcome=\"succeeded\"} 1"));
    assert!(text.contains("drishti_detections_total 1"));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = test_app();
    let response = app.router.oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
