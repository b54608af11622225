//! Utility functions for vision processing

use crate::error::VisionError;
use crate::frame::Frame;
use opencv::{
    core::{Size, CV_8UC3},
    imgproc,
    prelude::*,
};

/// Reject frames the detector cannot consume
pub fn ensure_bgr8(frame: &Frame) -> Result<(), VisionError> {
    if frame.empty() || frame.cols() <= 0 || frame.rows() <= 0 {
        return Err(VisionError::Detector("Empty frame".to_string()));
    }
    if frame.typ() != CV_8UC3 {
        return Err(VisionError::Detector(format!(
            "Unsupported frame type {} (expected 8-bit, 3 channels)",
            frame.typ()
        )));
    }
    Ok(())
}

/// Resize a BGR frame to `size` x `size`, convert to RGB, and lay it out as a
/// normalized `[3, size, size]` float tensor
pub fn frame_to_chw_tensor(frame: &Frame, size: u32) -> Result<Vec<f32>, VisionError> {
    ensure_bgr8(frame)?;

    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(size as i32, size as i32),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )
    .map_err(|e| VisionError::OpenCv(format!("Failed to resize frame: {}", e)))?;

    let mut rgb = Mat::default();
    imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
        .map_err(|e| VisionError::OpenCv(format!("Failed to convert color: {}", e)))?;

    let bytes = rgb
        .data_bytes()
        .map_err(|e| VisionError::OpenCv(format!("Failed to get Mat data: {}", e)))?;

    hwc_to_chw(bytes, size as usize, size as usize)
}

/// Convert packed 8-bit HWC pixels into planar CHW floats in [0, 1]
pub fn hwc_to_chw(bytes: &[u8], width: usize, height: usize) -> Result<Vec<f32>, VisionError> {
    let plane = width
        .checked_mul(height)
        .ok_or_else(|| VisionError::Detector("Tensor size overflow".to_string()))?;
    if bytes.len() != plane * 3 {
        return Err(VisionError::Detector(format!(
            "Expected {} bytes for {}x{}x3, got {}",
            plane * 3,
            width,
            height,
            bytes.len()
        )));
    }

    let mut tensor = vec![0.0f32; plane * 3];
    for (idx, px) in bytes.chunks_exact(3).enumerate() {
        tensor[idx] = px[0] as f32 / 255.0;
        tensor[plane + idx] = px[1] as f32 / 255.0;
        tensor[2 * plane + idx] = px[2] as f32 / 255.0;
    }
    Ok(tensor)
}
