//! Detector contract, YOLO model, and model management

pub mod detector;
pub mod manager;
pub mod yolo;

pub use detector::{non_max_suppression, Annotated, BoundingBox, Detection, Detector};
pub use manager::ModelManager;
pub use yolo::{YoloModel, COCO_CLASSES};
