//! Image and video annotation

pub mod image;
pub mod video;

pub use image::{decode_image, encode_jpeg, write_image, ImageAnnotator};
pub use video::{JobReport, JobState, VideoAnnotationPipeline};
