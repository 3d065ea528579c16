//! Durable store keeping one JSON document per upload.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/
//!   uploads/
//!     1.claim     identifier reservation
//!     1.json      {"format_version": 1, "entry": {...}}
//!     2.claim
//!     2.json
//! ```
//!
//! An identifier is reserved by creating its `.claim` file exclusively, so
//! several handles (or processes) on the same root never hand out the same
//! one. Claims are kept after rollback; rolled-back identifiers stay unused.
//!
//! A document is written only on commit, through a temp file that is synced
//! and then linked into place, so readers see a whole upload or nothing and
//! an existing document is never replaced.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use csvts_model::{HeaderMetadata, ObservationRecord, TimeWindow, Upload, UploadId};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::store::{IngestTransaction, ObservationStore, StagedUpload, UploadEntry, staged_mut};

/// Version written into every upload document.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

const UPLOADS_DIR: &str = "uploads";
const EXTENSION: &str = "json";
const CLAIM_EXTENSION: &str = "claim";

#[derive(Debug, Serialize, Deserialize)]
struct UploadDocument {
    format_version: u32,
    entry: UploadEntry,
}

/// Filesystem-backed [`ObservationStore`].
#[derive(Debug)]
pub struct FileStore {
    uploads_dir: PathBuf,
    next_id: AtomicU64,
}

impl FileStore {
    /// Opens (or creates) a store rooted at `root`.
    ///
    /// Identifier assignment resumes after the highest upload or claim
    /// already on disk.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let uploads_dir = root.as_ref().join(UPLOADS_DIR);
        fs::create_dir_all(&uploads_dir).map_err(|e| StoreError::Io {
            operation: "create directory",
            path: uploads_dir.clone(),
            source: e,
        })?;

        let highest = stored_ids(&uploads_dir, EXTENSION)?
            .into_iter()
            .chain(stored_ids(&uploads_dir, CLAIM_EXTENSION)?)
            .max()
            .unwrap_or(0);
        tracing::debug!(path = %uploads_dir.display(), highest, "opened file store");

        Ok(Self {
            uploads_dir,
            next_id: AtomicU64::new(highest + 1),
        })
    }

    /// Directory holding the upload documents.
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    fn document_path(&self, id: UploadId) -> PathBuf {
        self.uploads_dir.join(format!("{id}.{EXTENSION}"))
    }

    fn claim_path(&self, id: UploadId) -> PathBuf {
        self.uploads_dir.join(format!("{id}.{CLAIM_EXTENSION}"))
    }

    /// Reserves the next free identifier by creating its claim file.
    ///
    /// Identifiers claimed through another handle are skipped.
    fn claim_id(&self) -> Result<UploadId> {
        loop {
            let id = UploadId(self.next_id.fetch_add(1, Ordering::SeqCst));
            let path = self.claim_path(id);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(id),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(upload_id = %id, "identifier already claimed, trying next");
                }
                Err(e) => {
                    return Err(StoreError::Io {
                        operation: "claim",
                        path,
                        source: e,
                    });
                }
            }
        }
    }

    fn load_entry(&self, id: UploadId) -> Result<UploadEntry> {
        let path = self.document_path(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::UploadNotFound { id });
            }
            Err(e) => {
                return Err(StoreError::Io {
                    operation: "read",
                    path,
                    source: e,
                });
            }
        };
        parse_document(&bytes, &path)
    }

    fn save_entry(&self, entry: &UploadEntry) -> Result<()> {
        let path = self.document_path(entry.upload.id);
        let document = UploadDocument {
            format_version: CURRENT_FORMAT_VERSION,
            entry: entry.clone(),
        };
        let bytes = serde_json::to_vec(&document)
            .map_err(|source| StoreError::Serialization { source })?;
        write_new(entry.upload.id, &path, &bytes)
    }
}

impl ObservationStore for FileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn begin(&self) -> Result<Box<dyn IngestTransaction + '_>> {
        Ok(Box::new(FileTransaction {
            store: self,
            staged: None,
        }))
    }

    fn get_upload(&self, id: UploadId) -> Result<Upload> {
        Ok(self.load_entry(id)?.upload)
    }

    fn get_records(&self, id: UploadId, window: &TimeWindow) -> Result<Vec<ObservationRecord>> {
        let entry = self.load_entry(id)?;
        if window.is_unbounded() {
            return Ok(entry.records);
        }
        Ok(entry.records_in(window))
    }

    fn get_header_metadata(&self, id: UploadId) -> Result<Vec<HeaderMetadata>> {
        Ok(self.load_entry(id)?.headers)
    }

    fn list_uploads(&self) -> Result<Vec<Upload>> {
        let mut ids = stored_ids(&self.uploads_dir, EXTENSION)?;
        ids.sort_unstable();
        ids.into_iter()
            .map(|id| self.get_upload(UploadId(id)))
            .collect()
    }
}

struct FileTransaction<'a> {
    store: &'a FileStore,
    staged: Option<StagedUpload>,
}

impl IngestTransaction for FileTransaction<'_> {
    fn create_upload(&mut self, file_name: &str, client_address: &str) -> Result<Upload> {
        if self.staged.is_some() {
            return Err(StoreError::TransactionState {
                reason: "upload already created in this transaction",
            });
        }
        let id = self.store.claim_id()?;
        let upload = Upload::new(id, file_name, client_address);
        self.staged = Some(StagedUpload::new(upload.clone()));
        Ok(upload)
    }

    fn insert_records(
        &mut self,
        upload_id: UploadId,
        records: Vec<ObservationRecord>,
    ) -> Result<()> {
        staged_mut(&mut self.staged)?.add_records(upload_id, records)
    }

    fn insert_header_metadata(
        &mut self,
        upload_id: UploadId,
        entries: Vec<HeaderMetadata>,
    ) -> Result<()> {
        staged_mut(&mut self.staged)?.add_headers(upload_id, entries)
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        let Some(staged) = self.staged.take() else {
            return Ok(());
        };
        let entry = staged.into_entry();
        self.store.save_entry(&entry)?;
        tracing::info!(
            upload_id = %entry.upload.id,
            records = entry.records.len(),
            "committed upload to {}",
            self.store.document_path(entry.upload.id).display()
        );
        Ok(())
    }

    fn rollback(mut self: Box<Self>) {
        if let Some(staged) = self.staged.take() {
            tracing::debug!(upload_id = %staged.upload().id, "rolled back upload");
        }
    }
}

impl Drop for FileTransaction<'_> {
    fn drop(&mut self) {
        if let Some(staged) = self.staged.take() {
            tracing::warn!(
                upload_id = %staged.upload().id,
                "transaction dropped without commit, discarding upload"
            );
        }
    }
}

/// Identifiers of every `<id>.<extension>` file in `dir`.
fn stored_ids(dir: &Path, extension: &str) -> Result<Vec<u64>> {
    let entries = fs::read_dir(dir).map_err(|e| StoreError::Io {
        operation: "list",
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::Io {
            operation: "list",
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        if let Some(id) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u64>().ok())
        {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn parse_document(bytes: &[u8], path: &Path) -> Result<UploadEntry> {
    let document: UploadDocument =
        serde_json::from_slice(bytes).map_err(|e| StoreError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if document.format_version > CURRENT_FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: document.format_version,
            max_supported: CURRENT_FORMAT_VERSION,
            path: path.to_path_buf(),
        });
    }
    Ok(document.entry)
}

/// Writes `bytes` to a sibling temp file, syncs it, then links it to `path`.
///
/// Fails with [`StoreError::UploadExists`] if `path` is already present.
fn write_new(id: UploadId, path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("json.tmp");

    let mut file = File::create(&temp_path).map_err(|e| StoreError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;
    file.write_all(bytes).map_err(|e| StoreError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;
    file.sync_all().map_err(|e| StoreError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;
    drop(file);

    let linked = fs::hard_link(&temp_path, path);
    let removed = fs::remove_file(&temp_path);
    match linked {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(StoreError::UploadExists {
                id,
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(StoreError::Io {
                operation: "link",
                path: path.to_path_buf(),
                source: e,
            });
        }
    }
    removed.map_err(|e| StoreError::Io {
        operation: "remove",
        path: temp_path,
        source: e,
    })
}
