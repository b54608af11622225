//! Fetch the detector weights ahead of the first server start

use drishti_core::config::load_config_file;
use drishti_eye::config::VisionConfig;
use drishti_eye::error::VisionError;
use drishti_eye::models::ModelManager;
use std::env;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), VisionError> {
    let args: Vec<String> = env::args().collect();

    if args.len() > 2 {
        eprintln!("Usage: download_model [vision-config.(toml|json|yaml)]");
        std::process::exit(1);
    }

    let mut config = match args.get(1) {
        Some(path) => load_config_file::<VisionConfig>(Path::new(path))
            .map_err(|e| VisionError::Config(e.to_string()))?,
        None => VisionConfig::default(),
    };
    config.validate().map_err(VisionError::Config)?;
    // Running this binary is an explicit request to download
    config.auto_download = true;

    let manager = ModelManager::new(Arc::new(config));
    println!("Fetching detector weights...");
    let path = manager.ensure_configured_model().await?;
    println!("Model ready at: {:?}", path);

    Ok(())
}
