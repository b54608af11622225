//! Video annotation pipeline
//!
//! Reads every frame of a source video once, runs it through the detector,
//! and appends the annotated frame to the output. Frames are processed
//! strictly in order; frame N+1 is not read before frame N is written.

use crate::config::{FrameErrorPolicy, PipelineConfig};
use crate::error::VisionError;
use crate::frame::{FrameSize, FrameSource, VideoFileSource};
use crate::models::Detector;
use crate::sink::{FrameSink, VideoFileSink};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lifecycle of a video job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Outcome of a video job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub state: JobState,
    pub frames_read: u64,
    pub frames_written: u64,
    /// Frames written without annotations after a detector failure
    pub frames_passed_through: u64,
    pub size: FrameSize,
    pub frame_rate: f64,
    pub elapsed: Duration,
}

impl JobReport {
    fn new(size: FrameSize, frame_rate: f64) -> Self {
        Self {
            state: JobState::Idle,
            frames_read: 0,
            frames_written: 0,
            frames_passed_through: 0,
            size,
            frame_rate,
            elapsed: Duration::ZERO,
        }
    }
}

/// Sequential read, detect, write loop over a whole video
pub struct VideoAnnotationPipeline {
    detector: Arc<dyn Detector>,
    config: PipelineConfig,
}

impl VideoAnnotationPipeline {
    pub fn new(detector: Arc<dyn Detector>, config: PipelineConfig) -> Self {
        Self { detector, config }
    }

    /// Annotate the video at `input` into a new video at `output`.
    ///
    /// If `input` cannot be opened no output is created. If the job fails
    /// after the output was opened, the partial output is removed.
    pub fn run(&self, input: &Path, output: &Path) -> Result<JobReport, VisionError> {
        let source = VideoFileSource::open(input)?;
        let properties = *source.properties();
        let codec = self.config.fourcc().map_err(VisionError::UnwritableMedia)?;
        let frame_rate = self.config.resolve_frame_rate(properties.frame_rate);

        if frame_rate != properties.frame_rate {
            info!(
                "Encoding at {:.2}fps (source reports {:.2}fps)",
                frame_rate, properties.frame_rate
            );
        }

        let result = VideoFileSink::open(output, properties.size, frame_rate, codec)
            .and_then(|mut sink| self.annotate_stream(source, &mut sink));

        if result.is_err() {
            discard_partial_output(output);
        }
        result
    }

    /// Drive `source` through the detector into `sink`.
    ///
    /// The sink is closed exactly once, whether the job succeeds or fails.
    pub fn annotate_stream<S>(&self, mut source: S, sink: &mut dyn FrameSink) -> Result<JobReport, VisionError>
    where
        S: FrameSource,
    {
        let started = Instant::now();
        let properties = *source.properties();
        let mut report = JobReport::new(properties.size, self.config.resolve_frame_rate(properties.frame_rate));

        report.state = JobState::Running;
        info!(
            "Video job running: {} frames at {}, detector {}",
            properties
                .frame_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            properties.size,
            self.detector.name()
        );

        let driven = self.drive(&mut source, sink, &mut report);
        let closed = sink.close();
        report.elapsed = started.elapsed();

        match driven.and(closed) {
            Ok(()) => {
                report.state = JobState::Succeeded;
                info!(
                    "Video job succeeded: {} frames in {:.2}s ({} passed through)",
                    report.frames_written,
                    report.elapsed.as_secs_f64(),
                    report.frames_passed_through
                );
                Ok(report)
            }
            Err(e) => {
                report.state = JobState::Failed;
                error!(
                    "Video job failed after {} of {} frames: {}",
                    report.frames_written, report.frames_read, e
                );
                Err(e)
            }
        }
    }

    fn drive<S>(&self, source: &mut S, sink: &mut dyn FrameSink, report: &mut JobReport) -> Result<(), VisionError>
    where
        S: FrameSource,
    {
        for next in source {
            let frame = next?;
            report.frames_read += 1;
            let index = report.frames_read;

            let annotated = match self.detector.annotate(&frame) {
                Ok(annotated) => {
                    debug!("Frame {}: {} detections", index, annotated.detections.len());
                    annotated.frame
                }
                Err(e) if self.config.on_frame_error == FrameErrorPolicy::PassThrough => {
                    warn!("Frame {}: detector failed, writing it unannotated: {}", index, e);
                    report.frames_passed_through += 1;
                    frame
                }
                Err(e) => return Err(e),
            };

            sink.append(&annotated)?;
            report.frames_written += 1;
        }
        Ok(())
    }
}

fn discard_partial_output(output: &Path) {
    if output.exists() {
        match std::fs::remove_file(output) {
            Ok(()) => warn!("Removed partial output {:?}", output),
            Err(e) => warn!("Failed to remove partial output {:?}: {}", output, e),
        }
    }
}
