//! Detector contract and detection types

use crate::error::VisionError;
use crate::frame::Frame;
use crate::render::draw_detections;
use serde::Serialize;

/// Axis-aligned box in source-frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build from center coordinates, as YOLO heads emit them
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Clip to a `width` x `height` frame
    pub fn clamp(&self, width: f32, height: f32) -> Self {
        let x1 = self.x.clamp(0.0, width);
        let y1 = self.y.clamp(0.0, height);
        let x2 = (self.x + self.width).clamp(0.0, width);
        let y2 = (self.y + self.height).clamp(0.0, height);
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Intersection over union
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width).min(other.x + other.width);
        let iy2 = (self.y + self.height).min(other.y + other.height);

        if ix2 <= ix1 || iy2 <= iy1 {
            return 0.0;
        }

        let inter = (ix2 - ix1) * (iy2 - iy1);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 || !union.is_finite() {
            return 0.0;
        }
        inter / union
    }
}

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// A frame with its detections drawn on, plus the detections themselves
pub struct Annotated {
    pub frame: Frame,
    pub detections: Vec<Detection>,
}

/// Object detector.
///
/// Loaded once and shared read-only across requests, so implementations
/// must be `Send + Sync` and take `&self`.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    /// Detect objects in `frame`
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VisionError>;

    /// Detect objects and render them onto a copy of `frame`.
    ///
    /// The returned frame has the same dimensions as the input.
    fn annotate(&self, frame: &Frame) -> Result<Annotated, VisionError> {
        let detections = self.detect(frame)?;
        let frame = draw_detections(frame, &detections)?;
        Ok(Annotated { frame, detections })
    }
}

/// Greedy per-class non-maximum suppression. Keeps at most `limit` detections.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32, limit: usize) -> Vec<Detection> {
    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        if keep.len() >= limit {
            break;
        }
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}
