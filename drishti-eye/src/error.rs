//! Error types for drishti-eye

use drishti_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    /// Source media missing, corrupt, or in an unsupported format
    #[error("Unreadable media: {0}")]
    UnreadableMedia(String),

    /// Output path or codec rejected by the encoder
    #[error("Unwritable media: {0}")]
    UnwritableMedia(String),

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Frame size mismatch: expected {expected}, got {actual}")]
    FrameSize { expected: String, actual: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),

    #[error("OpenCV error: {0}")]
    OpenCv(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl VisionError {
    /// Errors caused by the submitted media rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, VisionError::UnreadableMedia(_))
    }
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Core(inner) => inner,
            VisionError::Io(io) => CoreError::Io(io),
            other => CoreError::Storage(format!("Vision error: {}", other)),
        }
    }
}

impl From<opencv::Error> for VisionError {
    fn from(err: opencv::Error) -> Self {
        VisionError::OpenCv(err.message)
    }
}

impl From<ort::Error> for VisionError {
    fn from(err: ort::Error) -> Self {
        VisionError::Ort(err.to_string())
    }
}
