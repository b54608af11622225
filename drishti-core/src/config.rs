// Shared configuration sections for drishti services

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log levels accepted by `LoggingConfig::level`
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: String,
    pub bind_port: u16,
    /// Maximum accepted upload size in bytes. `None` leaves uploads unbounded.
    pub max_upload_bytes: Option<usize>,
    pub enable_cors: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            bind_port: 8000,
            max_upload_bytes: None,
            enable_cors: false,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub results_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("./results"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_port == 0 {
            return Err(ConfigError::ValidationError(
                "network.bind_port cannot be 0".to_string(),
            ));
        }
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "network.bind_address cannot be empty".to_string(),
            ));
        }
        if self.max_upload_bytes == Some(0) {
            return Err(ConfigError::ValidationError(
                "network.max_upload_bytes must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.results_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.results_dir cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {:?}, got '{}'",
                LOG_LEVELS, self.level
            )));
        }
        Ok(())
    }
}

/// Parse a configuration document, trying JSON, then TOML, then YAML
pub fn parse_config<T: DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    let json_err = match serde_json::from_str::<T>(content) {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };
    let toml_err = match toml::from_str::<T>(content) {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };
    let yaml_err = match serde_yaml::from_str::<T>(content) {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };

    Err(ConfigError::ParseError(format!(
        "Unknown format (as JSON: {}; as TOML: {}; as YAML: {})",
        json_err,
        toml_err.message().trim_end(),
        yaml_err
    )))
}

/// Read and parse a configuration file.
///
/// `.json`, `.toml`, `.yaml` and `.yml` files go straight to their parser;
/// any other extension falls back to [`parse_config`].
pub fn load_config_file<T: DeserializeOwned>(path: &std::path::Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let parsed = match extension.as_deref() {
        Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
        Some("toml") => toml::from_str(&content).map_err(|e| e.message().trim_end().to_string()),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        _ => return parse_config(&content),
    };
    parsed.map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Configuration(err.to_string())
    }
}
