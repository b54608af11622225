// HTTP server: upload forms, detection jobs, and artifact serving

use crate::error::ApiError;
use crate::metrics::JobMetrics;
use crate::pages;
use crate::static_files::{serve_artifact, Disposition};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use drishti_core::{ArtifactStore, JobId, MediaKind, NetworkConfig};
use drishti_eye::{Detection, Detector, FrameSize, ImageAnnotator, PipelineConfig, VideoAnnotationPipeline};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Multipart field carrying the uploaded media
const FILE_FIELD: &str = "file";

/// Shared, read-only request state
#[derive(Clone)]
pub struct ApiState {
    /// Built once at startup and never replaced
    pub detector: Arc<dyn Detector>,
    pub artifacts: Arc<ArtifactStore>,
    pub pipeline: PipelineConfig,
    pub metrics: Arc<JobMetrics>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub detector: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
    pub elapsed_ms: u64,
}

pub fn create_router(state: ApiState, network: &NetworkConfig) -> Router {
    let body_limit = match network.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    let router = Router::new()
        .route("/", get(index_handler))
        .route("/upload_image", post(upload_image_handler))
        .route("/upload_video", post(upload_video_handler))
        .route("/api/v1/detect", post(detect_handler))
        .route("/results/:subfolder/:filename", get(results_handler))
        .route("/download/:subfolder/:filename", get(download_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found_handler)
        .layer(body_limit);

    let router = if network.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(format!("Malformed upload: {}", err.body_text()))
    }
}

fn missing_file() -> ApiError {
    ApiError::BadRequest(format!("No file uploaded (expected multipart field '{}')", FILE_FIELD))
}

/// Read the `file` field into memory
async fn read_file_field(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(FILE_FIELD) {
            return field.bytes().await.map_err(multipart_error);
        }
    }
    Err(missing_file())
}

/// Stream the `file` field into a temporary upload owned by `job`
async fn store_file_field(
    mut multipart: Multipart,
    store: &ArtifactStore,
    job: &JobId,
) -> Result<tempfile::NamedTempFile, ApiError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let upload = store.upload_file(job, field.file_name())?;
        let std_file = upload.reopen().map_err(drishti_core::Error::from)?;
        let mut file = tokio::fs::File::from_std(std_file);
        let mut received = 0usize;

        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            received += chunk.len();
            file.write_all(&chunk).await.map_err(drishti_core::Error::from)?;
        }
        file.flush().await.map_err(drishti_core::Error::from)?;

        info!("Job {}: received {} byte upload", job, received);
        return Ok(upload);
    }
    Err(missing_file())
}

async fn index_handler() -> Html<String> {
    Html(pages::index_page())
}

async fn upload_image_handler(State(state): State<ApiState>, multipart: Multipart) -> Result<Html<String>, ApiError> {
    let started = Instant::now();
    let bytes = read_file_field(multipart).await?;

    let job = JobId::new();
    let output = state.artifacts.artifact_path(MediaKind::Image, &job);
    let annotator = ImageAnnotator::new(state.detector.clone());
    info!("Job {}: image upload of {} bytes", job, bytes.len());

    let result = tokio::task::spawn_blocking(move || annotator.annotate_to_file(&bytes, &output))
        .await
        .map_err(|e| ApiError::Internal(format!("Image job aborted: {}", e)))?;

    let annotated = result.map_err(|e| {
        state.metrics.record_failure(MediaKind::Image);
        ApiError::from(e)
    })?;

    state.metrics.record_image(annotated.detections.len(), started.elapsed());
    info!(
        "Job {}: image done, {} detections in {:?}",
        job,
        annotated.detections.len(),
        started.elapsed()
    );

    Ok(Html(pages::image_result_page(
        &ArtifactStore::public_url(MediaKind::Image, &job),
        &ArtifactStore::download_url(MediaKind::Image, &job),
        &annotated.detections,
    )))
}

async fn upload_video_handler(State(state): State<ApiState>, multipart: Multipart) -> Result<Html<String>, ApiError> {
    let job = JobId::new();
    let upload = store_file_field(multipart, &state.artifacts, &job).await?;

    let output = state.artifacts.artifact_path(MediaKind::Video, &job);
    let pipeline = VideoAnnotationPipeline::new(state.detector.clone(), state.pipeline.clone());

    // The upload is removed once the job is done with it
    let result = tokio::task::spawn_blocking(move || {
        let report = pipeline.run(upload.path(), &output);
        drop(upload);
        report
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Video job aborted: {}", e)))?;

    let report = result.map_err(|e| {
        state.metrics.record_failure(MediaKind::Video);
        warn!("Job {}: video failed: {}", job, e);
        ApiError::from(e)
    })?;

    state
        .metrics
        .record_video(report.frames_written, report.frames_passed_through, report.elapsed);
    info!("Job {}: video done, {} frames in {:?}", job, report.frames_written, report.elapsed);

    Ok(Html(pages::video_result_page(
        &ArtifactStore::public_url(MediaKind::Video, &job),
        &ArtifactStore::download_url(MediaKind::Video, &job),
        &report,
    )))
}

async fn detect_handler(State(state): State<ApiState>, multipart: Multipart) -> Response {
    let started = Instant::now();
    let bytes = match read_file_field(multipart).await {
        Ok(bytes) => bytes,
        Err(e) => return e.into_json_response(),
    };

    let annotator = ImageAnnotator::new(state.detector.clone());
    let result = match tokio::task::spawn_blocking(move || annotator.annotate(&bytes)).await {
        Ok(result) => result,
        Err(e) => return ApiError::Internal(format!("Detection aborted: {}", e)).into_json_response(),
    };

    match result {
        Ok(annotated) => {
            state.metrics.record_image(annotated.detections.len(), started.elapsed());
            let size = FrameSize::of(&annotated.frame);
            Json(DetectResponse {
                width: size.width,
                height: size.height,
                detections: annotated.detections,
                elapsed_ms: started.elapsed().as_millis() as u64,
            })
            .into_response()
        }
        Err(e) => {
            state.metrics.record_failure(MediaKind::Image);
            ApiError::from(e).into_json_response()
        }
    }
}

async fn results_handler(
    State(state): State<ApiState>,
    Path((subfolder, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    serve_artifact(&state.artifacts, &subfolder, &filename, Disposition::Inline).await
}

async fn download_handler(
    State(state): State<ApiState>,
    Path((subfolder, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    serve_artifact(&state.artifacts, &subfolder, &filename, Disposition::Attachment).await
}

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        detector: state.detector.name().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn metrics_handler(State(state): State<ApiState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render_prometheus(),
    )
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Html(pages::error_page(StatusCode::NOT_FOUND, "Not found")),
    )
}
