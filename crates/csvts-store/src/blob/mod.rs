//! Raw file archiving.
//!
//! Uploaded bytes can be kept as-is next to the parsed records. The backend
//! is picked by configuration; only the local filesystem is implemented.

mod local;
mod remote;

pub use local::{LocalBlobStore, URL_PREFIX};
pub use remote::RemoteBlobStore;

use std::path::PathBuf;

use crate::error::BlobError;

/// Location of an archived file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Where the backend put the bytes.
    pub path: PathBuf,
    /// Name to pass back to [`BlobStore::read`] or [`BlobStore::url_for`].
    pub name: String,
}

/// Keeps raw uploaded files.
pub trait BlobStore: Send + Sync {
    /// Short backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Stores `bytes`, keeping the extension of `original_name`.
    fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError>;

    /// Public URL under which the blob is served.
    fn url_for(&self, name: &str) -> Result<String, BlobError>;

    /// Reads a stored blob back.
    fn read(&self, name: &str) -> Result<Vec<u8>, BlobError>;
}
