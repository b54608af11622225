//! Single image annotation

use crate::error::VisionError;
use crate::frame::{Frame, FrameSize};
use crate::models::{Annotated, Detector};
use opencv::{core::Vector, imgcodecs, prelude::*};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Decode an encoded image (JPEG, PNG, BMP, ...) into a BGR frame
pub fn decode_image(bytes: &[u8]) -> Result<Frame, VisionError> {
    if bytes.is_empty() {
        return Err(VisionError::UnreadableMedia("Empty image upload".to_string()));
    }

    let buffer = Vector::<u8>::from_slice(bytes);
    let frame = imgcodecs::imdecode(&buffer, imgcodecs::IMREAD_COLOR)
        .map_err(|e| VisionError::UnreadableMedia(format!("Failed to decode image: {}", e)))?;

    if frame.empty() {
        return Err(VisionError::UnreadableMedia(
            "Upload is not a recognised image format".to_string(),
        ));
    }
    debug!("Decoded image {}", FrameSize::of(&frame));
    Ok(frame)
}

/// Encode a frame as JPEG
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, VisionError> {
    let mut encoded = Vector::<u8>::new();
    let ok = imgcodecs::imencode(".jpg", frame, &mut encoded, &Vector::new())
        .map_err(|e| VisionError::UnwritableMedia(format!("Failed to encode JPEG: {}", e)))?;
    if !ok {
        return Err(VisionError::UnwritableMedia("JPEG encoder rejected the frame".to_string()));
    }
    Ok(encoded.to_vec())
}

/// Write a frame to `path`; the format follows the file extension
pub fn write_image(path: &Path, frame: &Frame) -> Result<(), VisionError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| VisionError::UnwritableMedia(format!("Non UTF-8 path: {:?}", path)))?;

    let ok = imgcodecs::imwrite(path_str, frame, &Vector::new())
        .map_err(|e| VisionError::UnwritableMedia(format!("Failed to write {:?}: {}", path, e)))?;
    if !ok {
        return Err(VisionError::UnwritableMedia(format!("Image encoder rejected {:?}", path)));
    }
    Ok(())
}

/// Runs the detector over uploaded still images
#[derive(Clone)]
pub struct ImageAnnotator {
    detector: Arc<dyn Detector>,
}

impl ImageAnnotator {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self { detector }
    }

    /// Decode `bytes` and annotate the image. Output has the input's dimensions.
    pub fn annotate(&self, bytes: &[u8]) -> Result<Annotated, VisionError> {
        let frame = decode_image(bytes)?;
        let annotated = self.detector.annotate(&frame)?;
        info!(
            "Annotated {} image: {} detections",
            FrameSize::of(&annotated.frame),
            annotated.detections.len()
        );
        Ok(annotated)
    }

    /// Annotate `bytes` and store the result at `output`
    pub fn annotate_to_file(&self, bytes: &[u8], output: &Path) -> Result<Annotated, VisionError> {
        let annotated = self.annotate(bytes)?;
        write_image(output, &annotated.frame)?;
        Ok(annotated)
    }
}
