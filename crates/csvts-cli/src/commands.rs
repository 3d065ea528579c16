//! Command implementations, independent of argument parsing.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use csvts_core::{
    AggregatePoint, AggregationKind, Bucket, IngestReport, ServiceConfig, TableView, aggregate,
    ingest, query,
};
use csvts_ingest::parse_observation_time;
use csvts_model::{TimeWindow, Upload, UploadId};
use csvts_store::ObservationStore;

use crate::logging::redact_value;

/// Builds a window from optional bound strings.
///
/// Bounds accept every format the ingestion parser does.
pub fn parse_window(start: Option<&str>, end: Option<&str>) -> Result<TimeWindow> {
    let parse = |label: &str, raw: Option<&str>| -> Result<_> {
        raw.map(|value| {
            parse_observation_time(value)
                .with_context(|| format!("invalid {label} time '{value}'"))
        })
        .transpose()
    };
    let window = TimeWindow::new(parse("start", start)?, parse("end", end)?);
    if let (Some(start), Some(end)) = (window.start, window.end)
        && start > end
    {
        bail!("start time {start} is after end time {end}");
    }
    Ok(window)
}

/// Reads `path` and ingests it under its file name.
pub fn run_ingest(
    config: &ServiceConfig,
    store: &dyn ObservationStore,
    path: &Path,
    client_address: &str,
) -> Result<IngestReport> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    Ok(ingest(config, store, file_name, client_address, &bytes)?)
}

/// Loads one upload's records in `window` as a table.
pub fn run_query(
    store: &dyn ObservationStore,
    upload_id: UploadId,
    window: &TimeWindow,
) -> Result<TableView> {
    let table = TableView::from(query(store, upload_id, window)?);
    for record in table.records() {
        let values = record
            .fields
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::trace!(
            observed_at = %record.observed_at,
            values = redact_value(&values),
            "record"
        );
    }
    Ok(table)
}

/// Writes the window as CSV to `output`, or to stdout when `None`.
pub fn run_export(
    store: &dyn ObservationStore,
    upload_id: UploadId,
    window: &TimeWindow,
    output: Option<&Path>,
) -> Result<usize> {
    let table = run_query(store, upload_id, window)?;
    match output {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            table.write_csv(io::BufWriter::new(file))?;
            tracing::info!(path = %path.display(), rows = table.len(), "exported CSV");
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            table.write_csv(&mut handle)?;
            handle.flush()?;
        }
    }
    Ok(table.len())
}

/// Aggregates `field` over the window.
pub fn run_aggregate(
    store: &dyn ObservationStore,
    upload_id: UploadId,
    window: &TimeWindow,
    field: &str,
    kind: AggregationKind,
    bucket: Bucket,
) -> Result<Vec<AggregatePoint>> {
    let table = run_query(store, upload_id, window)?;
    Ok(aggregate(&table, field, kind, bucket)?)
}

/// Every committed upload.
pub fn run_list(store: &dyn ObservationStore) -> Result<Vec<Upload>> {
    Ok(store.list_uploads()?)
}

/// Effective configuration as pretty JSON.
pub fn config_json(config: &ServiceConfig) -> Result<String> {
    serde_json::to_string_pretty(config).context("failed to serialize configuration")
}
