//! YOLOv8 object detection model

use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::frame::Frame;
use crate::models::detector::{non_max_suppression, BoundingBox, Detection, Detector};
use crate::utils::frame_to_chw_tensor;
use opencv::prelude::*;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Label for `class_id`, falling back to `class_<id>` for custom heads
pub fn class_name(class_id: usize, num_classes: usize) -> String {
    if num_classes == COCO_CLASSES.len() {
        if let Some(name) = COCO_CLASSES.get(class_id) {
            return name.to_string();
        }
    }
    format!("class_{}", class_id)
}

/// Decoding parameters for raw YOLOv8 head output
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    pub input_size: u32,
    pub frame_width: f32,
    pub frame_height: f32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

/// Decode a YOLOv8 output tensor laid out as `[1, 4 + classes, proposals]`.
///
/// Each proposal column holds `cx, cy, w, h` in model-input pixels followed
/// by one score per class. Boxes are rescaled to frame pixels, filtered by
/// confidence, and passed through NMS.
pub fn decode_output(dims: &[i64], data: &[f32], params: &DecodeParams) -> Result<Vec<Detection>, VisionError> {
    if dims.len() != 3 || dims[0] != 1 || dims[1] <= 4 || dims[2] <= 0 {
        return Err(VisionError::Detector(format!("Unexpected YOLO output shape {:?}", dims)));
    }

    let rows = dims[1] as usize;
    let proposals = dims[2] as usize;
    let num_classes = rows - 4;

    let expected = rows
        .checked_mul(proposals)
        .ok_or_else(|| VisionError::Detector("YOLO output size overflow".to_string()))?;
    if data.len() != expected {
        return Err(VisionError::Detector(format!(
            "YOLO output has {} values, shape {:?} needs {}",
            data.len(),
            dims,
            expected
        )));
    }

    let scale_x = params.frame_width / params.input_size as f32;
    let scale_y = params.frame_height / params.input_size as f32;
    let at = |row: usize, col: usize| data[row * proposals + col];

    let mut candidates = Vec::new();
    for i in 0..proposals {
        let (class_id, score) = (0..num_classes)
            .map(|c| (c, at(4 + c, i)))
            .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if !score.is_finite() || score < params.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            continue;
        }

        let bbox = BoundingBox::from_center(cx * scale_x, cy * scale_y, w * scale_x, h * scale_y)
            .clamp(params.frame_width, params.frame_height);
        if bbox.width <= 0.0 || bbox.height <= 0.0 {
            continue;
        }

        candidates.push(Detection {
            class_id,
            class_name: class_name(class_id, num_classes),
            confidence: score,
            bbox,
        });
    }

    Ok(non_max_suppression(candidates, params.iou_threshold, params.max_detections))
}

/// YOLOv8 model for object detection
pub struct YoloModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
}

impl YoloModel {
    /// Load the ONNX model at `config.model_path`
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        Self::load(&config.model_path, config)
    }

    fn load(model_path: &Path, config: &VisionConfig) -> Result<Self, VisionError> {
        if !model_path.is_file() {
            return Err(VisionError::Model(format!("Model file not found: {:?}", model_path)));
        }

        let session = Session::builder()
            .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::Ort(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(config.intra_threads)
            .map_err(|e| VisionError::Ort(format!("Failed to set intra threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model: {}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| VisionError::Model("Model declares no inputs".to_string()))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| VisionError::Model("Model declares no outputs".to_string()))?;

        info!(
            "YOLO model loaded from {:?} (input '{}', output '{}', {}px)",
            model_path, input_name, output_name, config.input_size
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        })
    }
}

impl Detector for YoloModel {
    fn name(&self) -> &str {
        "yolov8"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        let input = frame_to_chw_tensor(frame, self.input_size)?;
        let side = self.input_size as usize;
        let tensor = Tensor::from_array(([1usize, 3, side, side], input.into_boxed_slice()))
            .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))?;

        let params = DecodeParams {
            input_size: self.input_size,
            frame_width: frame.cols() as f32,
            frame_height: frame.rows() as f32,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        };

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| VisionError::Detector(format!("YOLO inference failed: {}", e)))?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Detector(format!("Failed to extract output tensor: {}", e)))?;
        let dims: Vec<i64> = shape.iter().copied().collect();

        let detections = decode_output(&dims, data, &params)?;
        debug!("YOLO detected {} objects", detections.len());
        Ok(detections)
    }
}
