// Serving stored media artifacts

use crate::error::ApiError;
use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
};
use drishti_core::{ArtifactStore, Error as CoreError, MediaKind};
use tracing::debug;

/// How the browser should treat a served artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Shown in the page (`<img>`, `<video>`)
    Inline,
    /// Saved as a file under its own name
    Attachment,
}

fn content_disposition(disposition: Disposition, filename: &str) -> String {
    match disposition {
        Disposition::Inline => "inline".to_string(),
        Disposition::Attachment => {
            let safe: String = filename
                .chars()
                .map(|c| if c == '"' || !c.is_ascii() { '_' } else { c })
                .collect();
            format!("attachment; filename=\"{}\"", safe)
        }
    }
}

/// Read the artifact `subfolder/filename` from `store` into a response.
///
/// A missing artifact is reported as `FileNotFound` with the requested name.
pub async fn serve_artifact(
    store: &ArtifactStore,
    subfolder: &str,
    filename: &str,
    disposition: Disposition,
) -> Result<Response<Body>, ApiError> {
    let path = store.resolve(subfolder, filename).map_err(|e| match e {
        CoreError::NotFound(_) => ApiError::FileNotFound(filename.to_string()),
        other => ApiError::Core(other),
    })?;

    // resolve() only accepts known subfolders
    let content_type = MediaKind::from_subfolder(subfolder)
        .map(|kind| kind.content_type())
        .unwrap_or("application/octet-stream");

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::FileNotFound(filename.to_string()));
        }
        Err(e) => return Err(ApiError::Core(CoreError::Io(e))),
    };
    debug!("Serving {:?} ({} bytes, {:?})", path, bytes.len(), disposition);

    let disposition = HeaderValue::from_str(&content_disposition(disposition, filename))
        .map_err(|e| ApiError::Internal(format!("Invalid Content-Disposition: {}", e)))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}
