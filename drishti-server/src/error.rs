// Request errors and their HTTP rendering

use crate::pages;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use drishti_core::Error as CoreError;
use drishti_eye::VisionError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Artifact lookup miss; carries the requested file name
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Upload too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::FileNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Vision(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Core(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Core(CoreError::InvalidPath(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::FileNotFound(_) => "FILE_NOT_FOUND",
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ApiError::Vision(VisionError::UnreadableMedia(_)) => "UNREADABLE_MEDIA",
            ApiError::Vision(_) => "PROCESSING_ERROR",
            ApiError::Core(CoreError::NotFound(_)) => "NOT_FOUND",
            ApiError::Core(CoreError::InvalidPath(_)) => "INVALID_PATH",
            ApiError::Core(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the client. Server-side failures are logged
    /// in full and reported generically.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::FileNotFound(name) => format!("File {} not found", name),
            ApiError::PayloadTooLarge => "Upload exceeds the configured size limit".to_string(),
            ApiError::Vision(VisionError::UnreadableMedia(_)) => {
                "Cannot open the uploaded file. Is it a supported image or video?".to_string()
            }
            ApiError::Core(CoreError::NotFound(_)) => "Not found".to_string(),
            ApiError::Core(CoreError::InvalidPath(_)) => "Invalid path".to_string(),
            _ => "Processing failed".to_string(),
        }
    }

    fn log(&self) {
        let status = self.status();
        if status.is_server_error() {
            error!("{} ({})", self, status);
        } else {
            warn!("{} ({})", self, status);
        }
    }

    /// JSON rendering for API routes
    pub fn into_json_response(self) -> Response {
        self.log();
        let body = ErrorResponse {
            error: self.public_message(),
            code: self.code().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// HTML rendering for browser-facing routes
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        (status, Html(pages::error_page(status, &self.public_message()))).into_response()
    }
}
