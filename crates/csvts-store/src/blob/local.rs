//! Content-addressed blob storage in a local directory.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::blob::{BlobStore, StoredBlob};
use crate::error::BlobError;

/// URL path under which local blobs are served.
pub const URL_PREFIX: &str = "/api/files";

/// Stores blobs in a directory, named by the SHA-256 of their content.
///
/// Saving identical bytes twice yields the same name and a single file. Blobs
/// are written to a temp file in the same directory, synced, then renamed into
/// place, so a blob under its final name always holds the full content.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, name: &str) -> Result<PathBuf, BlobError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

impl BlobStore for LocalBlobStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError> {
        fs::create_dir_all(&self.root).map_err(|e| BlobError::Io {
            operation: "create directory",
            path: self.root.clone(),
            source: e,
        })?;

        let name = content_name(original_name, bytes);
        let path = self.root.join(&name);
        if !path.exists() {
            write_atomic(&self.root, &path, bytes)?;
        }
        tracing::debug!(name = %name, size = bytes.len(), "archived upload");
        Ok(StoredBlob { path, name })
    }

    fn url_for(&self, name: &str) -> Result<String, BlobError> {
        validate_name(name)?;
        Ok(format!("{URL_PREFIX}/{name}"))
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.blob_path(name)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BlobError::NotFound {
                name: name.to_string(),
            },
            _ => BlobError::Io {
                operation: "read",
                path,
                source: e,
            },
        })
    }
}

/// Writes `bytes` to a uniquely named temp file in `dir`, syncs it, then
/// renames it over `path`.
fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), BlobError> {
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| BlobError::Io {
        operation: "create",
        path: dir.to_path_buf(),
        source: e,
    })?;
    temp.write_all(bytes).map_err(|e| BlobError::Io {
        operation: "write",
        path: temp.path().to_path_buf(),
        source: e,
    })?;
    temp.as_file().sync_all().map_err(|e| BlobError::Io {
        operation: "sync",
        path: temp.path().to_path_buf(),
        source: e,
    })?;
    temp.persist(path).map_err(|e| BlobError::Io {
        operation: "rename",
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// `<sha256 hex>` plus the lower-cased extension of `original_name`.
fn content_name(original_name: &str, bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    match Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(ext) if !ext.is_empty() => format!("{digest}.{}", ext.to_ascii_lowercase()),
        _ => digest,
    }
}

fn validate_name(name: &str) -> Result<(), BlobError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(BlobError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
