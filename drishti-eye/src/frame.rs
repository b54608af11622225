//! Frames and video frame sources

use crate::error::VisionError;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One raster image: 8-bit, 3 channels, BGR order
pub type Frame = Mat;

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of `frame`
    pub fn of(frame: &Frame) -> Self {
        Self {
            width: frame.cols().max(0) as u32,
            height: frame.rows().max(0) as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Properties a video container reports when opened
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoProperties {
    pub size: FrameSize,
    /// Frames per second as reported by the container. May be 0 when unknown.
    pub frame_rate: f64,
    /// Frame count as reported by the container; an estimate for some formats
    pub frame_count: Option<u64>,
}

/// Lazy, finite, forward-only sequence of frames in presentation order.
///
/// Not restartable: reopen the source to iterate again.
pub trait FrameSource: Iterator<Item = Result<Frame, VisionError>> {
    fn properties(&self) -> &VideoProperties;
}

/// Frame source reading a video file through OpenCV
pub struct VideoFileSource {
    path: PathBuf,
    capture: Option<VideoCapture>,
    properties: VideoProperties,
    frames_read: u64,
}

impl VideoFileSource {
    /// Open a video container.
    ///
    /// Fails with `UnreadableMedia` when the path is missing, the container
    /// cannot be opened, or it reports no frame dimensions.
    pub fn open(path: &Path) -> Result<Self, VisionError> {
        if !path.is_file() {
            return Err(VisionError::UnreadableMedia(format!("No such file: {:?}", path)));
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| VisionError::UnreadableMedia(format!("Non UTF-8 path: {:?}", path)))?;

        let capture = VideoCapture::from_file(path_str, CAP_ANY)
            .map_err(|e| VisionError::UnreadableMedia(format!("Failed to open {:?}: {}", path, e)))?;

        if !capture
            .is_opened()
            .map_err(|e| VisionError::UnreadableMedia(format!("Failed to open {:?}: {}", path, e)))?
        {
            return Err(VisionError::UnreadableMedia(format!("Cannot open video {:?}", path)));
        }

        let width = capture.get(CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
        let height = capture.get(CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
        let frame_rate = capture.get(CAP_PROP_FPS).unwrap_or(0.0);
        let frame_count = capture
            .get(CAP_PROP_FRAME_COUNT)
            .ok()
            .filter(|c| c.is_finite() && *c > 0.0)
            .map(|c| c as u64);

        let size = FrameSize::new(width.max(0.0) as u32, height.max(0.0) as u32);
        if size.is_empty() {
            return Err(VisionError::UnreadableMedia(format!(
                "Video {:?} reports no frame dimensions",
                path
            )));
        }

        info!(
            "Opened video {:?}: {} @ {:.2}fps, {} frames",
            path,
            size,
            frame_rate,
            frame_count.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string())
        );

        Ok(Self {
            path: path.to_path_buf(),
            capture: Some(capture),
            properties: VideoProperties {
                size,
                frame_rate,
                frame_count,
            },
            frames_read: 0,
        })
    }

    fn finish(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                warn!("Failed to release video {:?}: {}", self.path, e);
            }
            debug!("Video {:?} exhausted after {} frames", self.path, self.frames_read);
        }
    }
}

impl Iterator for VideoFileSource {
    type Item = Result<Frame, VisionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let capture = self.capture.as_mut()?;

        let mut frame = Mat::default();
        match capture.read(&mut frame) {
            Ok(true) if !frame.empty() => {
                self.frames_read += 1;
                Some(Ok(frame))
            }
            Ok(_) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(VisionError::UnreadableMedia(format!(
                    "Failed to decode frame {} of {:?}: {}",
                    self.frames_read + 1,
                    self.path,
                    e
                ))))
            }
        }
    }
}

impl FrameSource for VideoFileSource {
    fn properties(&self) -> &VideoProperties {
        &self.properties
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_display() {
        assert_eq!(FrameSize::new(640, 480).to_string(), "640x480");
        assert!(FrameSize::new(0, 480).is_empty());
        assert!(!FrameSize::new(1, 1).is_empty());
    }

    #[test]
    fn test_open_missing_file() {
        let result = VideoFileSource::open(Path::new("/nonexistent/clip.mp4"));
        assert!(matches!(result, Err(VisionError::UnreadableMedia(_))));
    }

    #[test]
    fn test_open_garbage_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"definitely not a video container").unwrap();

        let result = VideoFileSource::open(&path);
        assert!(matches!(result, Err(VisionError::UnreadableMedia(_))));
    }
}
