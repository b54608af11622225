//! Media artifact storage
//!
//! Every processed output is written under `<results_dir>/<kind>/<job_id>.<ext>`.
//! Keying by job id keeps concurrent requests from overwriting each other's
//! results. Artifacts are written once and never mutated or deleted here.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

const UPLOADS_DIR: &str = "uploads";
const MAX_FILENAME_LEN: usize = 255;

/// Kind of media a job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Image, MediaKind::Video];

    /// Subfolder of the results directory holding this kind
    pub fn subfolder(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/jpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    pub fn from_subfolder(subfolder: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.subfolder() == subfolder)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Request-scoped identifier for one processing job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(JobId)
            .map_err(|_| Error::InvalidPath(format!("Invalid job id: {}", s)))
    }
}

/// Filesystem-backed store for processed media
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the results directory layout if missing
    pub fn ensure_layout(&self) -> Result<()> {
        for kind in MediaKind::ALL {
            std::fs::create_dir_all(self.root.join(kind.subfolder()))?;
        }
        std::fs::create_dir_all(self.uploads_dir())?;
        info!("Results directory ready at {:?}", self.root);
        Ok(())
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn file_name(kind: MediaKind, job: &JobId) -> String {
        format!("{}.{}", job, kind.extension())
    }

    /// Where the artifact for `job` lives on disk
    pub fn artifact_path(&self, kind: MediaKind, job: &JobId) -> PathBuf {
        self.root
            .join(kind.subfolder())
            .join(Self::file_name(kind, job))
    }

    /// URL for viewing the artifact inline
    pub fn public_url(kind: MediaKind, job: &JobId) -> String {
        format!("/results/{}/{}", kind.subfolder(), Self::file_name(kind, job))
    }

    /// URL for downloading the artifact as an attachment
    pub fn download_url(kind: MediaKind, job: &JobId) -> String {
        format!("/download/{}/{}", kind.subfolder(), Self::file_name(kind, job))
    }

    /// Temporary file for a raw upload. Removed when the handle is dropped.
    pub fn upload_file(&self, job: &JobId, original_name: Option<&str>) -> Result<tempfile::NamedTempFile> {
        let suffix = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();

        tempfile::Builder::new()
            .prefix(&format!("{}-", job))
            .suffix(&suffix)
            .tempfile_in(self.uploads_dir())
            .map_err(Error::from)
    }

    /// Resolve a `subfolder/filename` pair from a request to an existing artifact
    pub fn resolve(&self, subfolder: &str, filename: &str) -> Result<PathBuf> {
        let kind = MediaKind::from_subfolder(subfolder)
            .ok_or_else(|| Error::NotFound(format!("{}/{}", subfolder, filename)))?;

        validate_filename(filename)?;

        let path = self.root.join(kind.subfolder()).join(filename);
        if !path.is_file() {
            return Err(Error::NotFound(filename.to_string()));
        }
        Ok(path)
    }
}

fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty() || filename.len() > MAX_FILENAME_LEN {
        return Err(Error::InvalidPath(format!("Invalid file name length: {}", filename.len())));
    }
    if filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
        || filename.chars().any(|c| c.is_control())
    {
        return Err(Error::InvalidPath(format!("Invalid file name: {:?}", filename)));
    }
    Ok(())
}
