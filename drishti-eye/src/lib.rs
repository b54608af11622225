//! drishti-eye: detection and annotation for drishti
//!
//! Decodes uploaded images and videos with OpenCV, runs a YOLOv8 detector
//! through ONNX Runtime on every frame, and draws the detections back onto
//! the media before it is re-encoded.

pub mod config;
pub mod error;
pub mod frame;
pub mod models;
pub mod processing;
pub mod render;
pub mod sink;
mod utils;

pub use config::{FrameErrorPolicy, FrameRatePolicy, PipelineConfig, VisionConfig};
pub use error::VisionError;
pub use frame::{Frame, FrameSize, FrameSource, VideoFileSource, VideoProperties};
pub use models::{Annotated, BoundingBox, Detection, Detector, ModelManager, YoloModel};
pub use processing::{ImageAnnotator, JobReport, JobState, VideoAnnotationPipeline};
pub use sink::{FrameSink, VideoFileSink};
