//! Persistence for uploads, their header metadata, and observation records.
//!
//! Two contracts live here:
//!
//! - [`ObservationStore`] with its [`IngestTransaction`]: everything written
//!   for one upload becomes visible together on commit, or not at all.
//! - [`BlobStore`]: optional archive of the raw uploaded bytes.
//!
//! # Backends
//!
//! | Store | Type | Durability |
//! |-------|------|------------|
//! | observations | [`MemoryStore`] | process lifetime |
//! | observations | [`FileStore`] | one JSON document per upload, atomic writes |
//! | blobs | [`LocalBlobStore`] | content-addressed files |
//! | blobs | [`RemoteBlobStore`] | not implemented, always fails |
//!
//! # Example
//!
//! ```
//! use csvts_model::{TimeWindow, TypeTag, HeaderMetadata};
//! use csvts_store::{MemoryStore, ObservationStore};
//!
//! let store = MemoryStore::new();
//! let mut tx = store.begin().unwrap();
//! let upload = tx.create_upload("data.csv", "127.0.0.1").unwrap();
//! tx.insert_header_metadata(upload.id, vec![HeaderMetadata::new("time", TypeTag::Timestamp, 0)])
//!     .unwrap();
//! tx.commit().unwrap();
//!
//! assert!(store.get_records(upload.id, &TimeWindow::unbounded()).unwrap().is_empty());
//! ```

mod blob;
mod error;
mod file;
mod memory;
mod store;

// === Error Types ===
pub use error::{BlobError, Result, StoreError};

// === Contracts ===
pub use store::{IngestTransaction, ObservationStore, UploadEntry};

// === Observation Backends ===
pub use file::{CURRENT_FORMAT_VERSION, FileStore};
pub use memory::MemoryStore;

// === Blob Backends ===
pub use blob::{BlobStore, LocalBlobStore, RemoteBlobStore, StoredBlob, URL_PREFIX};
