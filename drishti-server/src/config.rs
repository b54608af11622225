// Server configuration: file, environment, and command line layers

use drishti_core::config::{parse_config, ConfigError};
use drishti_core::{LoggingConfig, NetworkConfig, StorageConfig};
use drishti_eye::{PipelineConfig, VisionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete drishti-server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrishtiConfig {
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub vision: VisionConfig,
    pub pipeline: PipelineConfig,
}

/// Command line values that take precedence over file and environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model_path: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl DrishtiConfig {
    /// Load configuration from a JSON, TOML, or YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        parse_config(content)
    }

    /// Defaults with `DRISHTI_*` environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup. Unparseable values are ignored.
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DRISHTI_HOST") {
            self.network.bind_address = host;
        }
        if let Some(port) = lookup("DRISHTI_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.network.bind_port = port;
        }
        if let Some(limit) = lookup("DRISHTI_MAX_UPLOAD_BYTES").and_then(|l| l.parse::<usize>().ok()) {
            self.network.max_upload_bytes = Some(limit);
        }
        if let Some(dir) = lookup("DRISHTI_RESULTS_DIR") {
            self.storage.results_dir = PathBuf::from(dir);
        }
        if let Some(model) = lookup("DRISHTI_MODEL_PATH") {
            self.vision.model_path = PathBuf::from(model);
        }
        if let Some(level) = lookup("DRISHTI_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.network.bind_address = host;
        }
        if let Some(port) = overrides.port {
            self.network.bind_port = port;
        }
        if let Some(model) = overrides.model_path {
            self.vision.model_path = model;
        }
        if let Some(dir) = overrides.results_dir {
            self.storage.results_dir = dir;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        self.vision
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("vision: {}", e)))?;
        self.pipeline
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("pipeline: {}", e)))?;
        Ok(())
    }

    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.network.bind_address, self.network.bind_port)
    }
}
