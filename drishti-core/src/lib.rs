//! drishti-core: shared types for the drishti detection service
//!
//! Error type, configuration sections, and the media artifact store.

pub mod artifacts;
pub mod config;
pub mod error;

pub use artifacts::{ArtifactStore, JobId, MediaKind};
pub use config::{ConfigError, LoggingConfig, NetworkConfig, StorageConfig};
pub use error::{Error, Result};
