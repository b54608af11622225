//! Model manager with auto-download functionality

use crate::config::VisionConfig;
use crate::error::VisionError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const MAX_MODEL_SIZE: usize = 2_000_000_000; // 2GB
const MIN_MODEL_SIZE: usize = 1024;
const DOWNLOAD_TIMEOUT_SECS: u64 = 3600;

/// Locates detector weights on disk, fetching them when allowed
pub struct ModelManager {
    config: Arc<VisionConfig>,
}

impl ModelManager {
    pub fn new(config: Arc<VisionConfig>) -> Self {
        Self { config }
    }

    /// Ensure the directory holding the model exists
    pub fn ensure_model_dir(&self) -> Result<PathBuf, VisionError> {
        let dir = self
            .config
            .model_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!("Created model directory: {:?}", dir);
        }
        Ok(dir)
    }

    /// Path to the configured model, downloading it first if missing and
    /// `auto_download` is enabled
    pub async fn ensure_configured_model(&self) -> Result<PathBuf, VisionError> {
        let path = &self.config.model_path;
        if path.is_file() {
            info!("Model already present at {:?}", path);
            return Ok(path.clone());
        }
        if !self.config.auto_download {
            return Err(VisionError::Model(format!(
                "Model not found at {:?} and auto_download is disabled",
                path
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| VisionError::Model(format!("Invalid model path {:?}", path)))?
            .to_string();
        let dir = self.ensure_model_dir()?;
        self.ensure_model(&dir, &name, &self.config.model_url, &self.config.model_sha256)
            .await
    }

    /// Download `model_name` from `url` into `dir` unless it is already there
    pub async fn ensure_model(&self, dir: &Path, model_name: &str, url: &str, checksum: &str) -> Result<PathBuf, VisionError> {
        if model_name.is_empty() || model_name.len() > 255 {
            return Err(VisionError::Model("Invalid model name".to_string()));
        }
        if model_name.contains("..") || model_name.contains('/') || model_name.contains('\\') {
            return Err(VisionError::Model("Model name contains invalid characters".to_string()));
        }
        if url.is_empty() || url.len() > 2048 {
            return Err(VisionError::Model("Invalid URL".to_string()));
        }
        if !url.starts_with("https://") {
            return Err(VisionError::Model("Only HTTPS URLs are allowed for model downloads".to_string()));
        }

        let model_path = dir.join(model_name);
        if model_path.exists() {
            info!("Model {} already exists at {:?}", model_name, model_path);
            return Ok(model_path);
        }

        info!("Downloading model {} from {}", model_name, url);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;

        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(VisionError::Model(format!("Failed to download model: HTTP {}", response.status())));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_MODEL_SIZE as u64 {
                return Err(VisionError::Model(format!(
                    "Model too large: {} bytes (max {} bytes)",
                    content_length, MAX_MODEL_SIZE
                )));
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_MODEL_SIZE {
            return Err(VisionError::Model(format!(
                "Downloaded model too large: {} bytes (max {} bytes)",
                bytes.len(),
                MAX_MODEL_SIZE
            )));
        }
        if bytes.len() < MIN_MODEL_SIZE {
            return Err(VisionError::Model("Downloaded file too small, likely corrupted".to_string()));
        }

        if checksum.is_empty() {
            warn!("Downloaded {} bytes for model {} (checksum verification skipped)", bytes.len(), model_name);
        } else {
            verify_checksum(&bytes, checksum)
                .map_err(|computed| VisionError::Model(format!(
                    "Checksum mismatch for model {}: expected {}, got {}",
                    model_name, checksum, computed
                )))?;
            info!("Verified checksum for model {}", model_name);
        }

        // Write next to the target, then rename into place
        let temp_path = model_path.with_extension("part");
        fs::write(&temp_path, &bytes)?;
        if let Err(e) = fs::rename(&temp_path, &model_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(VisionError::Io(e));
        }

        info!("Model {} saved to {:?}", model_name, model_path);
        Ok(model_path)
    }
}

/// Compare the SHA-256 of `bytes` against `expected` (hex, case-insensitive).
/// Returns the computed digest on mismatch.
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<(), String> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let computed = hex::encode(hasher.finalize());
    if computed.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(computed)
    }
}
