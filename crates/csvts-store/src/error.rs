//! Storage error types.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use csvts_model::UploadId;
use thiserror::Error;

/// Errors raised by an [`ObservationStore`](crate::ObservationStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No upload exists with this identifier.
    #[error("upload {id} not found")]
    UploadNotFound { id: UploadId },

    /// A record with the same (upload, observation time) key already exists.
    #[error("upload {id} already has a record at {observed_at}")]
    Conflict {
        id: UploadId,
        observed_at: NaiveDateTime,
    },

    /// A header was given metadata twice for the same upload.
    #[error("upload {id} already has metadata for header '{header}'")]
    DuplicateHeader { id: UploadId, header: String },

    /// A committed document already exists for this identifier.
    #[error("upload {id} already exists at {path}")]
    UploadExists { id: UploadId, path: PathBuf },

    /// A write was issued in the wrong order within a transaction.
    #[error("invalid transaction state: {reason}")]
    TransactionState { reason: &'static str },

    /// File I/O error.
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored data could not be encoded or decoded.
    #[error("failed to serialize upload data")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// A stored upload file is not in the expected format.
    #[error("invalid upload file {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    /// A stored upload file was written by a newer format version.
    #[error("upload file version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion {
        found: u32,
        max_supported: u32,
        path: PathBuf,
    },

    /// Another thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Returns true if this error means the requested upload does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UploadNotFound { .. })
    }
}

/// Errors raised by a [`BlobStore`](crate::BlobStore).
#[derive(Debug, Error)]
pub enum BlobError {
    /// The backend does not support this operation.
    #[error("{backend} blob storage does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    /// Blob names must be a single path component.
    #[error("invalid blob name '{name}'")]
    InvalidName { name: String },

    /// No blob exists with this name.
    #[error("blob '{name}' not found")]
    NotFound { name: String },

    /// File I/O error.
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
