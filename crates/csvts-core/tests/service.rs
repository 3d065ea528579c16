use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use csvts_core::{
    AggregationKind, Bucket, ServiceConfig, ServiceError, StorageKind, TableView, aggregate,
    ingest, ingest_async, query, query_async,
};
use csvts_ingest::IngestError;
use csvts_model::{
    HeaderMetadata, ObservationRecord, TimeWindow, TypeTag, Upload, UploadId,
};
use csvts_store::{
    BlobError, BlobStore, FileStore, IngestTransaction, LocalBlobStore, MemoryStore,
    ObservationStore, StoreError,
};

const EXAMPLE: &str = "time,temp,label\n\
                       2024-01-01T00:00,21.5,ok\n\
                       2024-01-01T01:00,,bad\n\
                       not-a-date,19.0,x\n";

fn config() -> ServiceConfig {
    ServiceConfig {
        archive_uploads: false,
        ..ServiceConfig::default()
    }
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

#[test]
fn example_upload_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let memory: Box<dyn ObservationStore> = Box::new(MemoryStore::new());
    let file: Box<dyn ObservationStore> = Box::new(FileStore::open(dir.path()).unwrap());

    for store in [memory, file] {
        let report = ingest(
            &config(),
            store.as_ref(),
            "example.csv",
            "127.0.0.1",
            EXAMPLE.as_bytes(),
        )
        .unwrap();
        assert_eq!(report.schema.timestamp_column, "time");
        assert_eq!(report.stats.kept, 2);

        let result = query(store.as_ref(), report.upload_id(), &TimeWindow::unbounded()).unwrap();
        assert_eq!(result.total_count, 2);
        assert_eq!(result.records[1].fields.len(), 1);
        assert_eq!(result.records[1].get("label"), Some("bad"));

        let tags: Vec<(&str, TypeTag)> = result
            .header_metadata
            .iter()
            .map(|h| (h.header_name.as_str(), h.type_tag))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("time", TypeTag::Timestamp),
                ("temp", TypeTag::Float),
                ("label", TypeTag::Str),
            ]
        );
    }
}

#[test]
fn duplicate_times_persist_nothing() {
    let store = MemoryStore::new();
    let csv = "time,v\n2024-01-01 00:00,1\n2024-01-01T00:00:00,2\n";
    let err = ingest(&config(), &store, "dup.csv", "h", csv.as_bytes()).unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Ingest(IngestError::DuplicateObservationTime { line: 3, .. })
    ));
    assert!(store.list_uploads().unwrap().is_empty());
}

#[test]
fn no_timestamp_column_persists_nothing() {
    let store = MemoryStore::new();
    let err = ingest(&config(), &store, "names.csv", "h", b"name\nalice\n").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Ingest(IngestError::NoTimestampColumn { .. })
    ));
    assert!(store.list_uploads().unwrap().is_empty());
}

/// Delegates to a memory store but fails every record insert.
struct FailingStore {
    inner: MemoryStore,
}

struct FailingTransaction<'a> {
    inner: Box<dyn IngestTransaction + 'a>,
}

impl ObservationStore for FailingStore {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    fn begin(&self) -> csvts_store::Result<Box<dyn IngestTransaction + '_>> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin()?,
        }))
    }

    fn get_upload(&self, id: UploadId) -> csvts_store::Result<Upload> {
        self.inner.get_upload(id)
    }

    fn get_records(
        &self,
        id: UploadId,
        window: &TimeWindow,
    ) -> csvts_store::Result<Vec<ObservationRecord>> {
        self.inner.get_records(id, window)
    }

    fn get_header_metadata(&self, id: UploadId) -> csvts_store::Result<Vec<HeaderMetadata>> {
        self.inner.get_header_metadata(id)
    }

    fn list_uploads(&self) -> csvts_store::Result<Vec<Upload>> {
        self.inner.list_uploads()
    }
}

impl IngestTransaction for FailingTransaction<'_> {
    fn create_upload(&mut self, file_name: &str, client_address: &str) -> csvts_store::Result<Upload> {
        self.inner.create_upload(file_name, client_address)
    }

    fn insert_records(
        &mut self,
        _upload_id: UploadId,
        _records: Vec<ObservationRecord>,
    ) -> csvts_store::Result<()> {
        Err(StoreError::Io {
            operation: "write",
            path: "records".into(),
            source: std::io::Error::other("disk full"),
        })
    }

    fn insert_header_metadata(
        &mut self,
        upload_id: UploadId,
        entries: Vec<HeaderMetadata>,
    ) -> csvts_store::Result<()> {
        self.inner.insert_header_metadata(upload_id, entries)
    }

    fn commit(self: Box<Self>) -> csvts_store::Result<()> {
        self.inner.commit()
    }

    fn rollback(self: Box<Self>) {
        self.inner.rollback();
    }
}

#[test]
fn storage_failure_rolls_back_upload() {
    let store = FailingStore {
        inner: MemoryStore::new(),
    };
    let err = ingest(&config(), &store, "a.csv", "h", EXAMPLE.as_bytes()).unwrap_err();

    assert!(matches!(err, ServiceError::Storage(StoreError::Io { .. })));
    assert!(store.list_uploads().unwrap().is_empty());
    assert!(store.get_header_metadata(UploadId(1)).unwrap_err().is_not_found());
}

#[test]
fn query_is_idempotent_and_window_inclusive() {
    let store = MemoryStore::new();
    let csv = "time,v\n\
               2024-01-01T00:00,1\n\
               2024-01-02T00:00,2\n\
               2024-01-03T00:00,3\n\
               2024-01-04T00:00,4\n";
    let id = ingest(&config(), &store, "w.csv", "h", csv.as_bytes())
        .unwrap()
        .upload_id();

    let window = TimeWindow::new(Some(at(2, 0)), Some(at(3, 0)));
    let first = query(&store, id, &window).unwrap();
    let second = query(&store, id, &window).unwrap();
    assert_eq!(first, second);

    let times: Vec<_> = first.records.iter().map(|r| r.observed_at).collect();
    assert_eq!(times, vec![at(2, 0), at(3, 0)]);
    assert_eq!(first.header_metadata.len(), 2);
}

#[test]
fn unknown_upload_is_not_found() {
    let store = MemoryStore::new();
    let err = query(&store, UploadId(12), &TimeWindow::unbounded()).unwrap_err();
    assert_eq!(err.missing_upload(), Some(UploadId(12)));
}

#[test]
fn csv_export_restores_declared_columns() {
    let store = MemoryStore::new();
    let csv = "site,time,count\n\
               north,2024-01-01T00:00,3\n\
               ,2024-01-01T01:00,4\n\
               south,2024-01-01T02:00,null\n";
    let id = ingest(&config(), &store, "sites.csv", "h", csv.as_bytes())
        .unwrap()
        .upload_id();
    let table = TableView::from(query(&store, id, &TimeWindow::unbounded()).unwrap());

    insta::assert_snapshot!(table.to_csv().unwrap(), @r"
    time,site,count
    2024-01-01T00:00:00,north,3
    2024-01-01T01:00:00,,4
    2024-01-01T02:00:00,south,
    ");
}

#[test]
fn csv_export_keeps_fractional_seconds() {
    let store = MemoryStore::new();
    let csv = "time,v\n\
               2024-01-01T00:00:00.250,1\n\
               2024-01-01T00:00:00.750,2\n";
    let id = ingest(&config(), &store, "fast.csv", "h", csv.as_bytes())
        .unwrap()
        .upload_id();
    let exported = TableView::from(query(&store, id, &TimeWindow::unbounded()).unwrap())
        .to_csv()
        .unwrap();

    insta::assert_snapshot!(exported, @r"
    time,v
    2024-01-01T00:00:00.250,1
    2024-01-01T00:00:00.750,2
    ");

    let again = ingest(&config(), &store, "again.csv", "h", exported.as_bytes()).unwrap();
    assert_eq!(again.stats.kept, 2);
}

#[test]
fn aggregate_daily_sum_over_query() {
    let store = MemoryStore::new();
    let csv = "time,kwh\n\
               2024-01-01T08:00,1.5\n\
               2024-01-01T20:00,2.5\n\
               2024-01-02T08:00,oops\n";
    let id = ingest(&config(), &store, "kwh.csv", "h", csv.as_bytes())
        .unwrap()
        .upload_id();
    let table = TableView::from(query(&store, id, &TimeWindow::unbounded()).unwrap());

    let points = aggregate(&table, "kwh", AggregationKind::Sum, Bucket::Daily).unwrap();
    let summary: Vec<(&str, f64, usize)> = points
        .iter()
        .map(|p| (p.period.as_str(), p.value, p.count))
        .collect();
    assert_eq!(summary, vec![("2024-01-01", 4.0, 2), ("2024-01-02", 0.0, 1)]);
}

#[test]
fn local_archive_keeps_raw_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        local_storage_path: dir.path().join("uploads"),
        ..ServiceConfig::default()
    };
    let store = MemoryStore::new();
    let report = ingest(&config, &store, "Example.CSV", "h", EXAMPLE.as_bytes()).unwrap();

    let blob = report.blob.expect("archived blob");
    assert!(blob.name.ends_with(".csv"));
    let blobs = LocalBlobStore::new(dir.path().join("uploads"));
    assert_eq!(blobs.read(&blob.name).unwrap(), EXAMPLE.as_bytes());
}

#[test]
fn rejected_upload_leaves_no_archive() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("uploads");
    let config = ServiceConfig {
        local_storage_path: archive.clone(),
        ..ServiceConfig::default()
    };
    let store = MemoryStore::new();
    let err = ingest(&config, &store, "names.csv", "h", b"name\nalice\n").unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Ingest(IngestError::NoTimestampColumn { .. })
    ));
    let archived = std::fs::read_dir(&archive).map_or(0, Iterator::count);
    assert_eq!(archived, 0);
}

#[test]
fn remote_archive_is_unsupported() {
    let config = ServiceConfig {
        storage_kind: StorageKind::Remote,
        ..ServiceConfig::default()
    };
    let store = MemoryStore::new();
    let err = ingest(&config, &store, "a.csv", "h", EXAMPLE.as_bytes()).unwrap_err();

    assert!(matches!(
        err,
        ServiceError::BlobStorage(BlobError::Unsupported { .. })
    ));
    assert!(err.suggestion().is_some());
    assert!(store.list_uploads().unwrap().is_empty());
}

#[tokio::test]
async fn async_wrappers_run_pipeline() {
    let store: Arc<dyn ObservationStore> = Arc::new(MemoryStore::new());
    let report = ingest_async(
        config(),
        Arc::clone(&store),
        "async.csv".to_string(),
        "127.0.0.1".to_string(),
        EXAMPLE.as_bytes().to_vec(),
    )
    .await
    .unwrap();

    let result = query_async(store, report.upload_id(), TimeWindow::unbounded())
        .await
        .unwrap();
    assert_eq!(result.total_count, 2);
}
