//! Video frame sinks

use crate::error::VisionError;
use crate::frame::{Frame, FrameSize};
use opencv::{
    core::Size,
    prelude::*,
    videoio::VideoWriter,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Ordered, append-only destination for frames.
///
/// `close` must be called once the last frame is appended; implementations
/// make it idempotent and also close on drop.
pub trait FrameSink {
    fn append(&mut self, frame: &Frame) -> Result<(), VisionError>;
    fn close(&mut self) -> Result<(), VisionError>;
}

/// Frame sink encoding to a video file through OpenCV
pub struct VideoFileSink {
    path: PathBuf,
    writer: Option<VideoWriter>,
    size: FrameSize,
    frames_written: u64,
}

impl VideoFileSink {
    /// Open an output container.
    ///
    /// Fails with `UnwritableMedia` when the codec, frame rate, size, or
    /// target path are rejected.
    pub fn open(path: &Path, size: FrameSize, frame_rate: f64, codec: [char; 4]) -> Result<Self, VisionError> {
        if size.is_empty() || size.width > i32::MAX as u32 || size.height > i32::MAX as u32 {
            return Err(VisionError::UnwritableMedia(format!("Invalid frame size {}", size)));
        }
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(VisionError::UnwritableMedia(format!("Invalid frame rate {}", frame_rate)));
        }
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                return Err(VisionError::UnwritableMedia(format!(
                    "Output directory {:?} does not exist",
                    parent
                )));
            }
            _ => {}
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| VisionError::UnwritableMedia(format!("Non UTF-8 path: {:?}", path)))?;

        let fourcc = VideoWriter::fourcc(codec[0], codec[1], codec[2], codec[3])
            .map_err(|e| VisionError::UnwritableMedia(format!("Invalid codec {:?}: {}", codec, e)))?;

        let writer = VideoWriter::new(
            path_str,
            fourcc,
            frame_rate,
            Size::new(size.width as i32, size.height as i32),
            true,
        )
        .map_err(|e| VisionError::UnwritableMedia(format!("Failed to open writer for {:?}: {}", path, e)))?;

        if !writer.is_opened().unwrap_or(false) {
            return Err(VisionError::UnwritableMedia(format!(
                "Encoder rejected {:?} (codec {:?}, {} @ {}fps)",
                path,
                codec.iter().collect::<String>(),
                size,
                frame_rate
            )));
        }

        info!(
            "Opened video writer {:?}: {} @ {:.2}fps ({})",
            path,
            size,
            frame_rate,
            codec.iter().collect::<String>()
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            size,
            frames_written: 0,
        })
    }
}

impl FrameSink for VideoFileSink {
    fn append(&mut self, frame: &Frame) -> Result<(), VisionError> {
        let actual = FrameSize::of(frame);
        if actual != self.size {
            return Err(VisionError::FrameSize {
                expected: self.size.to_string(),
                actual: actual.to_string(),
            });
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| VisionError::UnwritableMedia(format!("Writer for {:?} already closed", self.path)))?;

        writer
            .write(frame)
            .map_err(|e| VisionError::UnwritableMedia(format!("Failed to write frame to {:?}: {}", self.path, e)))?;
        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), VisionError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .release()
                .map_err(|e| VisionError::UnwritableMedia(format!("Failed to finalize {:?}: {}", self.path, e)))?;
            debug!("Closed video writer {:?} after {} frames", self.path, self.frames_written);
        }
        Ok(())
    }
}

impl Drop for VideoFileSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{}", e);
        }
    }
}
