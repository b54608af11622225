// drishti-server: upload an image or video, get it back with detections drawn on

use anyhow::Context;
use clap::Parser;
use drishti_server::config::{DrishtiConfig, Overrides};
use drishti_server::http::create_router;
use drishti_server::startup::{build_state, init_logging, load_detector};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "drishti-server", version, about = "Object detection over uploaded images and videos")]
struct Cli {
    /// Configuration file (JSON, TOML, or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to bind
    #[arg(short, long)]
    port: Option<u16>,

    /// ONNX detector weights
    #[arg(long)]
    model: Option<PathBuf>,

    /// Directory for processed media
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// error, warn, info, debug, or trace
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(cli: Cli) -> anyhow::Result<DrishtiConfig> {
    let mut config = match &cli.config {
        Some(path) => DrishtiConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => DrishtiConfig::default(),
    };
    config.apply_env();
    config.apply_overrides(Overrides {
        host: cli.host,
        port: cli.port,
        model_path: cli.model,
        results_dir: cli.results_dir,
        log_level: cli.log_level,
    });
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config(Cli::parse())?;
    init_logging(&config.logging);

    info!("Starting drishti-server {}", env!("CARGO_PKG_VERSION"));

    let detector = load_detector(&config.vision)
        .await
        .context("failed to load detector")?;
    let state = build_state(&config, detector).context("failed to prepare results directory")?;
    info!("Results stored under {:?}", state.artifacts.root());

    let app = create_router(state, &config.network);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("HTTP server failed")?;

    info!("drishti-server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, finishing in-flight requests");
}
