//! Storage contracts for uploads and their records.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use csvts_model::{HeaderMetadata, ObservationRecord, TimeWindow, Upload, UploadId};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Read access plus a transactional write path.
///
/// Implementations hand out unique upload identifiers atomically and never
/// expose an upload whose transaction has not committed.
pub trait ObservationStore: Send + Sync {
    /// Short backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Starts a unit of work for one ingestion.
    fn begin(&self) -> Result<Box<dyn IngestTransaction + '_>>;

    /// Looks up an upload.
    fn get_upload(&self, id: UploadId) -> Result<Upload>;

    /// Records of `id` inside `window`, ascending by observation time.
    fn get_records(&self, id: UploadId, window: &TimeWindow) -> Result<Vec<ObservationRecord>>;

    /// Header metadata of `id` in declared column order.
    fn get_header_metadata(&self, id: UploadId) -> Result<Vec<HeaderMetadata>>;

    /// Every committed upload, ascending by identifier.
    fn list_uploads(&self) -> Result<Vec<Upload>>;
}

/// Writes for one ingestion, committed or discarded as a unit.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// everything written through it.
pub trait IngestTransaction {
    /// Creates the upload record and assigns its identifier.
    fn create_upload(&mut self, file_name: &str, client_address: &str) -> Result<Upload>;

    /// Adds records to the upload created in this transaction.
    ///
    /// Fails with [`StoreError::Conflict`] if an observation time repeats.
    fn insert_records(&mut self, upload_id: UploadId, records: Vec<ObservationRecord>)
    -> Result<()>;

    /// Adds header metadata to the upload created in this transaction.
    fn insert_header_metadata(
        &mut self,
        upload_id: UploadId,
        entries: Vec<HeaderMetadata>,
    ) -> Result<()>;

    /// Makes every write visible to readers.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write.
    fn rollback(self: Box<Self>);
}

/// A committed upload with everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadEntry {
    pub upload: Upload,
    /// Sorted by position.
    pub headers: Vec<HeaderMetadata>,
    /// Sorted by observation time.
    pub records: Vec<ObservationRecord>,
}

impl UploadEntry {
    /// Records inside `window`, in time order.
    pub fn records_in(&self, window: &TimeWindow) -> Vec<ObservationRecord> {
        self.records
            .iter()
            .filter(|record| window.contains(record.observed_at))
            .cloned()
            .collect()
    }
}

/// Writes buffered by a transaction before commit.
///
/// Enforces the (upload, observation time) and (upload, header) keys so both
/// backends reject collisions the same way.
#[derive(Debug)]
pub(crate) struct StagedUpload {
    upload: Upload,
    headers: BTreeMap<String, HeaderMetadata>,
    records: BTreeMap<NaiveDateTime, ObservationRecord>,
}

impl StagedUpload {
    pub(crate) fn new(upload: Upload) -> Self {
        Self {
            upload,
            headers: BTreeMap::new(),
            records: BTreeMap::new(),
        }
    }

    pub(crate) fn upload(&self) -> &Upload {
        &self.upload
    }

    fn check_target(&self, upload_id: UploadId) -> Result<()> {
        if upload_id == self.upload.id {
            Ok(())
        } else {
            Err(StoreError::UploadNotFound { id: upload_id })
        }
    }

    pub(crate) fn add_records(
        &mut self,
        upload_id: UploadId,
        records: Vec<ObservationRecord>,
    ) -> Result<()> {
        self.check_target(upload_id)?;
        for record in records {
            if self.records.contains_key(&record.observed_at) {
                return Err(StoreError::Conflict {
                    id: upload_id,
                    observed_at: record.observed_at,
                });
            }
            self.records.insert(record.observed_at, record);
        }
        Ok(())
    }

    pub(crate) fn add_headers(
        &mut self,
        upload_id: UploadId,
        entries: Vec<HeaderMetadata>,
    ) -> Result<()> {
        self.check_target(upload_id)?;
        for entry in entries {
            if self.headers.contains_key(&entry.header_name) {
                return Err(StoreError::DuplicateHeader {
                    id: upload_id,
                    header: entry.header_name,
                });
            }
            self.headers.insert(entry.header_name.clone(), entry);
        }
        Ok(())
    }

    pub(crate) fn into_entry(self) -> UploadEntry {
        let mut headers: Vec<HeaderMetadata> = self.headers.into_values().collect();
        headers.sort_by_key(|h| h.position);
        UploadEntry {
            upload: self.upload,
            headers,
            records: self.records.into_values().collect(),
        }
    }
}

/// Returns the staged upload or a state error if none was created yet.
pub(crate) fn staged_mut(staged: &mut Option<StagedUpload>) -> Result<&mut StagedUpload> {
    staged.as_mut().ok_or(StoreError::TransactionState {
        reason: "no upload created in this transaction",
    })
}
