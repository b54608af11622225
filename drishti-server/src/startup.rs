// Process startup: logging, detector, and shared state

use crate::config::DrishtiConfig;
use crate::http::ApiState;
use crate::metrics::JobMetrics;
use drishti_core::{ArtifactStore, LoggingConfig};
use drishti_eye::{Detector, ModelManager, VisionConfig, VisionError, YoloModel};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over
/// the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    // A subscriber may already be installed, e.g. in tests
    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Fetch the weights if needed and build the detector. Runs once per process.
pub async fn load_detector(config: &VisionConfig) -> Result<Arc<dyn Detector>, VisionError> {
    let started = Instant::now();
    let manager = ModelManager::new(Arc::new(config.clone()));
    let model_path = manager.ensure_configured_model().await?;

    let mut vision = config.clone();
    vision.model_path = model_path;

    // Session creation reads and optimizes the whole graph
    let model = tokio::task::spawn_blocking(move || YoloModel::new(&vision))
        .await
        .map_err(|e| VisionError::Model(format!("Model loading aborted: {}", e)))??;

    info!("Detector {} ready in {:?}", model.name(), started.elapsed());
    Ok(Arc::new(model))
}

/// Prepare the results directory and assemble request state
pub fn build_state(config: &DrishtiConfig, detector: Arc<dyn Detector>) -> drishti_core::Result<ApiState> {
    let artifacts = ArtifactStore::new(config.storage.results_dir.clone());
    artifacts.ensure_layout()?;

    Ok(ApiState {
        detector,
        artifacts: Arc::new(artifacts),
        pipeline: config.pipeline.clone(),
        metrics: Arc::new(JobMetrics::new()),
    })
}
