//! Contract checks run against every observation backend.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::thread;

use chrono::{NaiveDate, NaiveDateTime};
use csvts_model::{HeaderMetadata, ObservationRecord, TimeWindow, TypeTag, UploadId};
use csvts_store::{FileStore, MemoryStore, ObservationStore, StoreError};
use tempfile::TempDir;

fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(6, 30, 0)
        .unwrap()
}

fn record(day: u32) -> ObservationRecord {
    let mut fields = BTreeMap::new();
    fields.insert("level".to_string(), format!("{day}.5"));
    ObservationRecord::new(at(day), fields)
}

fn backends() -> Vec<(Arc<dyn ObservationStore>, Option<TempDir>)> {
    let dir = tempfile::tempdir().unwrap();
    let memory: Arc<dyn ObservationStore> = Arc::new(MemoryStore::new());
    let file: Arc<dyn ObservationStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    vec![(memory, None), (file, Some(dir))]
}

#[test]
fn committed_upload_round_trips() {
    for (store, _dir) in backends() {
        let mut tx = store.begin().unwrap();
        let upload = tx.create_upload("levels.csv", "192.0.2.7").unwrap();
        tx.insert_header_metadata(
            upload.id,
            vec![
                HeaderMetadata::new("level", TypeTag::Float, 1),
                HeaderMetadata::new("when", TypeTag::Timestamp, 0),
            ],
        )
        .unwrap();
        tx.insert_records(upload.id, vec![record(3), record(1), record(2)])
            .unwrap();
        tx.commit().unwrap();

        let stored = store.get_upload(upload.id).unwrap();
        assert_eq!(stored.client_address, "192.0.2.7", "{}", store.backend_name());

        let headers: Vec<_> = store
            .get_header_metadata(upload.id)
            .unwrap()
            .into_iter()
            .map(|h| h.header_name)
            .collect();
        assert_eq!(headers, vec!["when", "level"]);

        let times: Vec<_> = store
            .get_records(upload.id, &TimeWindow::unbounded())
            .unwrap()
            .into_iter()
            .map(|r| r.observed_at)
            .collect();
        assert_eq!(times, vec![at(1), at(2), at(3)]);

        let window = TimeWindow::new(Some(at(2)), None);
        assert_eq!(store.get_records(upload.id, &window).unwrap().len(), 2);
    }
}

#[test]
fn conflicting_record_aborts_whole_upload() {
    for (store, _dir) in backends() {
        let id = {
            let mut tx = store.begin().unwrap();
            let upload = tx.create_upload("dup.csv", "h").unwrap();
            tx.insert_records(upload.id, vec![record(1)]).unwrap();
            let err = tx.insert_records(upload.id, vec![record(1)]).unwrap_err();
            assert!(matches!(err, StoreError::Conflict { .. }));
            tx.rollback();
            upload.id
        };
        assert!(store.get_upload(id).unwrap_err().is_not_found());
        assert!(store.list_uploads().unwrap().is_empty());
    }
}

#[test]
fn unknown_upload_is_not_found() {
    for (store, _dir) in backends() {
        let err = store
            .get_records(UploadId(404), &TimeWindow::unbounded())
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.get_header_metadata(UploadId(404)).is_err());
    }
}

#[test]
fn concurrent_transactions_get_distinct_ids() {
    for (store, _dir) in backends() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut tx = store.begin().unwrap();
                    let upload = tx.create_upload("c.csv", "h").unwrap();
                    tx.insert_records(upload.id, vec![record(1)]).unwrap();
                    tx.commit().unwrap();
                    upload.id
                })
            })
            .collect();

        let ids: HashSet<UploadId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 8);
        assert_eq!(store.list_uploads().unwrap().len(), 8);
    }
}

#[test]
fn file_handles_sharing_a_root_never_reuse_ids() {
    let dir = tempfile::tempdir().unwrap();
    let first = FileStore::open(dir.path()).unwrap();
    let second = FileStore::open(dir.path()).unwrap();

    let commit = |store: &FileStore, file_name: &str, level: &str| {
        let mut tx = store.begin().unwrap();
        let upload = tx.create_upload(file_name, "h").unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("level".to_string(), level.to_string());
        tx.insert_records(upload.id, vec![ObservationRecord::new(at(1), fields)])
            .unwrap();
        tx.commit().unwrap();
        upload.id
    };

    let a = commit(&first, "a.csv", "A");
    let b = commit(&second, "b.csv", "B");
    assert_ne!(a, b);

    let names: Vec<_> = first
        .list_uploads()
        .unwrap()
        .into_iter()
        .map(|u| u.file_name)
        .collect();
    assert_eq!(names, vec!["a.csv", "b.csv"]);

    let records = second.get_records(a, &TimeWindow::unbounded()).unwrap();
    assert_eq!(records[0].get("level"), Some("A"));
}
