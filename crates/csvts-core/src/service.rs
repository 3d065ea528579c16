//! Ingestion and query entry points.

use std::path::Path;
use std::sync::Arc;

use csvts_ingest::{InferredSchema, NormalizeStats, PreparedUpload, prepare_upload};
use csvts_model::{HeaderMetadata, ObservationRecord, TimeWindow, Upload, UploadId};
use csvts_store::{ObservationStore, StoreError, StoredBlob};
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};

const CSV_EXTENSION: &str = "csv";

/// What an accepted upload produced.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub upload: Upload,
    pub schema: InferredSchema,
    pub stats: NormalizeStats,
    /// Archived copy of the raw bytes, when archiving is enabled.
    pub blob: Option<StoredBlob>,
}

impl IngestReport {
    pub fn upload_id(&self) -> UploadId {
        self.upload.id
    }
}

/// Records of one upload inside a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Ascending by observation time.
    pub records: Vec<ObservationRecord>,
    /// Every tagged header of the upload, in declared order.
    pub header_metadata: Vec<HeaderMetadata>,
    /// Number of entries in `records`.
    pub total_count: usize,
}

/// Ingests one CSV file.
///
/// The name must end in `.csv` and the content must fit in
/// `config.max_file_size`. On success the upload, its header metadata and all
/// kept records are visible together; on any failure none of them are.
#[tracing::instrument(
    skip(config, store, bytes),
    fields(size = bytes.len(), backend = store.backend_name(), upload_id = tracing::field::Empty)
)]
pub fn ingest(
    config: &ServiceConfig,
    store: &dyn ObservationStore,
    file_name: &str,
    client_address: &str,
    bytes: &[u8],
) -> Result<IngestReport> {
    let file_name = file_name.trim().to_lowercase();
    if let Err(err) = check_upload(config, &file_name, bytes) {
        tracing::warn!(error = %err, "rejected upload");
        return Err(err);
    }

    let PreparedUpload {
        schema,
        records,
        stats,
    } = prepare_upload(bytes).inspect_err(|err| {
        tracing::warn!(error = %err, "rejected upload");
    })?;
    tracing::debug!(
        timestamp_column = %schema.timestamp_column,
        headers = schema.headers.len(),
        "inferred schema"
    );

    let blob = if config.archive_uploads {
        let blobs = config.blob_store();
        let blob = blobs.save(&file_name, bytes)?;
        tracing::debug!(backend = blobs.backend_name(), blob = %blob.name, "archived raw upload");
        Some(blob)
    } else {
        None
    };

    let upload = persist(
        store,
        &file_name,
        client_address,
        schema.headers.clone(),
        records,
    )?;
    tracing::Span::current().record("upload_id", upload.id.get());
    tracing::info!(
        upload_id = %upload.id,
        records = stats.kept,
        dropped = stats.invalid_timestamp + stats.empty_rows,
        "accepted upload"
    );

    Ok(IngestReport {
        upload,
        schema,
        stats,
        blob,
    })
}

/// Rejects files by name or size before any parsing.
fn check_upload(config: &ServiceConfig, file_name: &str, bytes: &[u8]) -> Result<()> {
    let is_csv = Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CSV_EXTENSION));
    if !is_csv {
        return Err(ServiceError::UnsupportedFileType {
            file_name: file_name.to_string(),
        });
    }

    let size = bytes.len() as u64;
    if size > config.max_file_size {
        return Err(ServiceError::FileTooLarge {
            size,
            max: config.max_file_size,
        });
    }
    Ok(())
}

/// Writes one upload in a single transaction.
fn persist(
    store: &dyn ObservationStore,
    file_name: &str,
    client_address: &str,
    headers: Vec<HeaderMetadata>,
    records: Vec<ObservationRecord>,
) -> std::result::Result<Upload, StoreError> {
    let mut tx = store.begin()?;
    let upload = tx.create_upload(file_name, client_address)?;

    let written = tx
        .insert_header_metadata(upload.id, headers)
        .and_then(|()| tx.insert_records(upload.id, records));

    match written {
        Ok(()) => {
            tx.commit()?;
            Ok(upload)
        }
        Err(err) => {
            tracing::warn!(upload_id = %upload.id, error = %err, "rolling back upload");
            tx.rollback();
            Err(err)
        }
    }
}

/// Returns the records of `upload_id` inside `window`.
///
/// Reading twice with the same arguments yields the same result.
#[tracing::instrument(skip(store, window), fields(upload_id = %upload_id))]
pub fn query(
    store: &dyn ObservationStore,
    upload_id: UploadId,
    window: &TimeWindow,
) -> Result<QueryResult> {
    let header_metadata = store.get_header_metadata(upload_id)?;
    let records = store.get_records(upload_id, window)?;
    let total_count = records.len();
    tracing::info!(total_count, "queried upload");

    Ok(QueryResult {
        records,
        header_metadata,
        total_count,
    })
}

/// Runs [`ingest`] on the blocking thread pool.
pub async fn ingest_async(
    config: ServiceConfig,
    store: Arc<dyn ObservationStore>,
    file_name: String,
    client_address: String,
    bytes: Vec<u8>,
) -> Result<IngestReport> {
    tokio::task::spawn_blocking(move || {
        ingest(&config, store.as_ref(), &file_name, &client_address, &bytes)
    })
    .await
    .map_err(|source| ServiceError::TaskJoin { source })?
}

/// Runs [`query`] on the blocking thread pool.
pub async fn query_async(
    store: Arc<dyn ObservationStore>,
    upload_id: UploadId,
    window: TimeWindow,
) -> Result<QueryResult> {
    tokio::task::spawn_blocking(move || query(store.as_ref(), upload_id, &window))
        .await
        .map_err(|source| ServiceError::TaskJoin { source })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use csvts_store::MemoryStore;

    fn config() -> ServiceConfig {
        ServiceConfig {
            archive_uploads: false,
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn test_rejects_non_csv_name() {
        let store = MemoryStore::new();
        let err = ingest(&config(), &store, "data.xlsx", "h", b"time\n").unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedFileType { .. }));
    }

    #[test]
    fn test_rejects_oversized_file() {
        let store = MemoryStore::new();
        let config = ServiceConfig {
            max_file_size: 4,
            ..config()
        };
        let err = ingest(&config, &store, "a.csv", "h", b"time,v\n").unwrap_err();
        assert!(matches!(err, ServiceError::FileTooLarge { size: 7, max: 4 }));
    }

    #[test]
    fn test_file_name_is_lower_cased() {
        let store = MemoryStore::new();
        let report = ingest(
            &config(),
            &store,
            "Sensor.CSV",
            "10.1.1.1",
            b"time,v\n2024-01-01,1\n",
        )
        .unwrap();
        assert_eq!(report.upload.file_name, "sensor.csv");
        assert_eq!(store.get_upload(report.upload_id()).unwrap().file_name, "sensor.csv");
    }

    #[test]
    fn test_query_unknown_upload() {
        let store = MemoryStore::new();
        let err = query(&store, UploadId(7), &TimeWindow::unbounded()).unwrap_err();
        assert!(err.is_not_found());
    }
}
