//! In-process store backed by a mutex-guarded map.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use csvts_model::{HeaderMetadata, ObservationRecord, TimeWindow, Upload, UploadId};

use crate::error::{Result, StoreError};
use crate::store::{IngestTransaction, ObservationStore, StagedUpload, UploadEntry, staged_mut};

/// Keeps every committed upload in memory.
///
/// Identifiers start at 1 and are taken from an atomic counter, so two
/// concurrent transactions never share one. Rolled-back transactions leave
/// gaps in the sequence.
#[derive(Debug)]
pub struct MemoryStore {
    uploads: Mutex<BTreeMap<UploadId, UploadEntry>>,
    next_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            uploads: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<UploadId, UploadEntry>>> {
        self.uploads.lock().map_err(|_| StoreError::Poisoned)
    }

    fn with_entry<T>(&self, id: UploadId, f: impl FnOnce(&UploadEntry) -> T) -> Result<T> {
        let uploads = self.lock()?;
        uploads
            .get(&id)
            .map(f)
            .ok_or(StoreError::UploadNotFound { id })
    }
}

impl ObservationStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn begin(&self) -> Result<Box<dyn IngestTransaction + '_>> {
        Ok(Box::new(MemoryTransaction {
            store: self,
            staged: None,
        }))
    }

    fn get_upload(&self, id: UploadId) -> Result<Upload> {
        self.with_entry(id, |entry| entry.upload.clone())
    }

    fn get_records(&self, id: UploadId, window: &TimeWindow) -> Result<Vec<ObservationRecord>> {
        self.with_entry(id, |entry| entry.records_in(window))
    }

    fn get_header_metadata(&self, id: UploadId) -> Result<Vec<HeaderMetadata>> {
        self.with_entry(id, |entry| entry.headers.clone())
    }

    fn list_uploads(&self) -> Result<Vec<Upload>> {
        let uploads = self.lock()?;
        Ok(uploads.values().map(|entry| entry.upload.clone()).collect())
    }
}

/// Buffers writes until commit; nothing is visible before then.
struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    staged: Option<StagedUpload>,
}

impl IngestTransaction for MemoryTransaction<'_> {
    fn create_upload(&mut self, file_name: &str, client_address: &str) -> Result<Upload> {
        if self.staged.is_some() {
            return Err(StoreError::TransactionState {
                reason: "upload already created in this transaction",
            });
        }
        let id = UploadId(self.store.next_id.fetch_add(1, Ordering::SeqCst));
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
        let id = entry.upload.id;
        let records = entry.records.len();
        self.store.lock()?.insert(id, entry);
        tracing::debug!(upload_id = %id, records, "committed upload to memory store");
        Ok(())
    }

    fn rollback(mut self: Box<Self>) {
        if let Some(staged) = self.staged.take() {
            tracing::debug!(upload_id = %staged.upload().id, "rolled back upload");
        }
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if let Some(staged) = self.staged.take() {
            tracing::warn!(
                upload_id = %staged.upload().id,
                "transaction dropped without commit, discarding upload"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32, value: &str) -> ObservationRecord {
        let at = NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("v".to_string(), value.to_string());
        ObservationRecord::new(at, fields)
    }

    #[test]
    fn test_uncommitted_upload_is_invisible() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        let upload = tx.create_upload("a.csv", "127.0.0.1").unwrap();
        tx.insert_records(upload.id, vec![record(1, "x")]).unwrap();

        assert!(store.get_upload(upload.id).unwrap_err().is_not_found());
        tx.commit().unwrap();
        assert_eq!(store.get_upload(upload.id).unwrap().file_name, "a.csv");
    }

    #[test]
    fn test_drop_discards_writes() {
        let store = MemoryStore::new();
        let id = {
            let mut tx = store.begin().unwrap();
            let upload = tx.create_upload("a.csv", "127.0.0.1").unwrap();
            tx.insert_records(upload.id, vec![record(1, "x")]).unwrap();
            upload.id
        };
        assert!(store.get_records(id, &TimeWindow::unbounded()).is_err());
        assert!(store.list_uploads().unwrap().is_empty());
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut tx = store.begin().unwrap();
            ids.push(tx.create_upload("a.csv", "h").unwrap().id);
            tx.commit().unwrap();
        }
        assert_eq!(ids, vec![UploadId(1), UploadId(2), UploadId(3)]);
    }

    #[test]
    fn test_second_create_in_same_transaction_fails() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.create_upload("a.csv", "h").unwrap();
        let err = tx.create_upload("b.csv", "h").unwrap_err();
        assert!(matches!(err, StoreError::TransactionState { .. }));
    }

    #[test]
    fn test_insert_before_create_fails() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        let err = tx.insert_records(UploadId(1), vec![]).unwrap_err();
        assert!(matches!(err, StoreError::TransactionState { .. }));
    }

    #[test]
    fn test_window_filter_is_inclusive() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        let upload = tx.create_upload("a.csv", "h").unwrap();
        tx.insert_records(
            upload.id,
            vec![record(1, "a"), record(2, "b"), record(3, "c")],
        )
        .unwrap();
        tx.commit().unwrap();

        let start = record(2, "").observed_at;
        let window = TimeWindow::new(Some(start), Some(start));
        let records = store.get_records(upload.id, &window).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("v"), Some("b"));
    }
}
