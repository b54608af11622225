//! Configuration for drishti-eye

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Public YOLOv8n ONNX export
pub const DEFAULT_MODEL_URL: &str =
    "https://github.com/ultralytics/assets/releases/download/v8.2.0/yolov8n.onnx";

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Path of the ONNX weights file
    pub model_path: PathBuf,
    /// Where to fetch the weights from when missing
    pub model_url: String,
    /// Expected SHA-256 of the weights (hex). Empty skips verification.
    pub model_sha256: String,
    /// Download the weights at startup if they are not on disk
    pub auto_download: bool,
    /// Square model input size in pixels
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/yolov8n.onnx"),
            model_url: DEFAULT_MODEL_URL.to_string(),
            model_sha256: String::new(),
            auto_download: true,
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
            intra_threads: 1,
        }
    }
}

impl VisionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model_path.as_os_str().is_empty() {
            return Err("model_path cannot be empty".to_string());
        }
        if self.input_size == 0 || self.input_size > 4096 || self.input_size % 32 != 0 {
            return Err("input_size must be a multiple of 32 between 32 and 4096".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("confidence_threshold must be within [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err("iou_threshold must be within [0, 1]".to_string());
        }
        if self.max_detections == 0 {
            return Err("max_detections must be > 0".to_string());
        }
        if self.intra_threads == 0 {
            return Err("intra_threads must be > 0".to_string());
        }
        if !self.model_sha256.is_empty()
            && (self.model_sha256.len() != 64 || !self.model_sha256.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err("model_sha256 must be 64 hex characters".to_string());
        }
        Ok(())
    }
}

/// How the output video's frame rate is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRatePolicy {
    /// Use the rate the source container reports
    MatchSource,
    /// Always encode at this rate regardless of the source
    Fixed(f64),
}

/// What to do when the detector fails on a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameErrorPolicy {
    /// Abort the whole job
    Abort,
    /// Log the failure and write the frame without annotations
    PassThrough,
}

/// Video annotation pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// FourCC code of the output encoder
    pub codec: String,
    pub frame_rate: FrameRatePolicy,
    /// Used when `MatchSource` is set but the container reports no usable rate
    pub fallback_frame_rate: f64,
    pub on_frame_error: FrameErrorPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            codec: "mp4v".to_string(),
            frame_rate: FrameRatePolicy::MatchSource,
            fallback_frame_rate: 20.0,
            on_frame_error: FrameErrorPolicy::Abort,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.codec.chars().count() != 4 || !self.codec.is_ascii() {
            return Err(format!("codec must be a 4 character FourCC, got '{}'", self.codec));
        }
        if !valid_rate(self.fallback_frame_rate) {
            return Err("fallback_frame_rate must be between 0 and 240".to_string());
        }
        if let FrameRatePolicy::Fixed(rate) = self.frame_rate {
            if !valid_rate(rate) {
                return Err("fixed frame_rate must be between 0 and 240".to_string());
            }
        }
        Ok(())
    }

    /// Output rate for a source reporting `source_rate`
    pub fn resolve_frame_rate(&self, source_rate: f64) -> f64 {
        match self.frame_rate {
            FrameRatePolicy::Fixed(rate) => rate,
            FrameRatePolicy::MatchSource if valid_rate(source_rate) => source_rate,
            FrameRatePolicy::MatchSource => self.fallback_frame_rate,
        }
    }

    /// FourCC characters of `codec`
    pub fn fourcc(&self) -> Result<[char; 4], String> {
        let chars: Vec<char> = self.codec.chars().collect();
        <[char; 4]>::try_from(chars)
            .map_err(|_| format!("codec must be a 4 character FourCC, got '{}'", self.codec))
    }
}

fn valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0 && rate <= 240.0
}
