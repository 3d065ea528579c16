//! Service configuration.
//!
//! Configuration is a plain value passed into every service call. It can be
//! read from a JSON file; missing keys take their defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csvts_store::{BlobStore, FileStore, LocalBlobStore, RemoteBlobStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default upper bound on an uploaded file, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10_000_000;

/// Where raw uploaded files are archived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// A directory on the local filesystem.
    #[default]
    Local,
    /// Object storage. Not implemented; archiving fails.
    Remote,
}

impl StorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" | "s3" => Ok(Self::Remote),
            other => Err(format!(
                "unknown storage kind '{other}' (expected local or remote)"
            )),
        }
    }
}

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings for ingestion and storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Display name of the service.
    pub app_name: String,
    /// Blob backend used to archive raw uploads.
    pub storage_kind: StorageKind,
    /// Directory for archived uploads when `storage_kind` is local.
    pub local_storage_path: PathBuf,
    /// Root directory of the file-backed observation store.
    pub data_dir: PathBuf,
    /// Largest accepted upload, in bytes.
    pub max_file_size: u64,
    /// Whether raw bytes are archived before parsing.
    pub archive_uploads: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            app_name: "CSV Upload API".to_string(),
            storage_kind: StorageKind::default(),
            local_storage_path: PathBuf::from("uploads"),
            data_dir: PathBuf::from("data"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            archive_uploads: true,
        }
    }
}

impl ServiceConfig {
    /// Reads a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path` if given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Builds the configured blob backend.
    pub fn blob_store(&self) -> Box<dyn BlobStore> {
        match self.storage_kind {
            StorageKind::Local => Box::new(LocalBlobStore::new(&self.local_storage_path)),
            StorageKind::Remote => Box::new(RemoteBlobStore::new()),
        }
    }

    /// Opens the file-backed observation store under `data_dir`.
    pub fn open_store(&self) -> Result<FileStore, StoreError> {
        FileStore::open(&self.data_dir)
    }
}
