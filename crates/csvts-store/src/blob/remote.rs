use crate::blob::{BlobStore, StoredBlob};
use crate::error::BlobError;

const BACKEND: &str = "remote";

/// Object-storage backend placeholder.
///
/// Selectable through configuration so deployments can name it, but every
/// operation fails with [`BlobError::Unsupported`].
#[derive(Debug, Clone, Default)]
pub struct RemoteBlobStore;

impl RemoteBlobStore {
    pub fn new() -> Self {
        Self
    }
}

impl BlobStore for RemoteBlobStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn save(&self, _original_name: &str, _bytes: &[u8]) -> Result<StoredBlob, BlobError> {
        Err(BlobError::Unsupported {
            backend: BACKEND,
            operation: "save",
        })
    }

    fn url_for(&self, _name: &str) -> Result<String, BlobError> {
        Err(BlobError::Unsupported {
            backend: BACKEND,
            operation: "url_for",
        })
    }

    fn read(&self, _name: &str) -> Result<Vec<u8>, BlobError> {
        Err(BlobError::Unsupported {
            backend: BACKEND,
            operation: "read",
        })
    }
}
