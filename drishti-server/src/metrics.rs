use drishti_core::MediaKind;
use metrics::{counter, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Job counters, mirrored to the `metrics` recorder and rendered at `/metrics`
#[derive(Debug, Default)]
pub struct JobMetrics {
    images_succeeded: AtomicU64,
    images_failed: AtomicU64,
    videos_succeeded: AtomicU64,
    videos_failed: AtomicU64,
    frames_written: AtomicU64,
    frames_passed_through: AtomicU64,
    detections: AtomicU64,
}

impl JobMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_image(&self, detections: usize, elapsed: Duration) {
        self.images_succeeded.fetch_add(1, Ordering::Relaxed);
        self.detections.fetch_add(detections as u64, Ordering::Relaxed);

        counter!("drishti_jobs_total", "kind" => "image", "outcome" => "succeeded").increment(1);
        counter!("drishti_detections_total").increment(detections as u64);
        histogram!("drishti_job_duration_seconds", "kind" => "image").record(elapsed.as_secs_f64());
    }

    pub fn record_video(&self, frames_written: u64, frames_passed_through: u64, elapsed: Duration) {
        self.videos_succeeded.fetch_add(1, Ordering::Relaxed);
        self.frames_written.fetch_add(frames_written, Ordering::Relaxed);
        self.frames_passed_through
            .fetch_add(frames_passed_through, Ordering::Relaxed);

        counter!("drishti_jobs_total", "kind" => "video", "outcome" => "succeeded").increment(1);
        counter!("drishti_frames_written_total").increment(frames_written);
        counter!("drishti_frames_passed_through_total").increment(frames_passed_through);
        histogram!("drishti_job_duration_seconds", "kind" => "video").record(elapsed.as_secs_f64());
    }

    pub fn record_failure(&self, kind: MediaKind) {
        match kind {
            MediaKind::Image => {
                self.images_failed.fetch_add(1, Ordering::Relaxed);
                counter!("drishti_jobs_total", "kind" => "image", "outcome" => "failed").increment(1);
            }
            MediaKind::Video => {
                self.videos_failed.fetch_add(1, Ordering::Relaxed);
                counter!("drishti_jobs_total", "kind" => "video", "outcome" => "failed").increment(1);
            }
        }
    }

    /// Prometheus text exposition
    pub fn render_prometheus(&self) -> String {
        let load = |v: &AtomicU64| v.load(Ordering::Relaxed);
        format!(
            "# HELP drishti_jobs_total Completed detection jobs\n\
             # TYPE drishti_jobs_total counter\n\
             drishti_jobs_total{{kind=\"image\",outcome=\"succeeded\"}} {}\n\
             drishti_jobs_total{{kind=\"image\",outcome=\"failed\"}} {}\n\
             drishti_jobs_total{{kind=\"video\",outcome=\"succeeded\"}} {}\n\
             drishti_jobs_total{{kind=\"video\",outcome=\"failed\"}} {}\n\
             # HELP drishti_frames_written_total Annotated video frames written\n\
             # TYPE drishti_frames_written_total counter\n\
             drishti_frames_written_total {}\n\
             # HELP drishti_frames_passed_through_total Video frames written without annotations after a detector failure\n\
             # TYPE drishti_frames_passed_through_total counter\n\
             drishti_frames_passed_through_total {}\n\
             # HELP drishti_detections_total Objects detected in images\n\
             # TYPE drishti_detections_total counter\n\
             drishti_detections_total {}\n",
            load(&self.images_succeeded),
            load(&self.images_failed),
            load(&self.videos_succeeded),
            load(&self.videos_failed),
            load(&self.frames_written),
            load(&self.frames_passed_through),
            load(&self.detections),
        )
    }
}
