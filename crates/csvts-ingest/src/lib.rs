//! Time-series CSV ingestion.
//!
//! This crate turns the bytes of an uploaded CSV file into storable records.
//! It does no I/O of its own; persistence lives in `csvts-store`.
//!
//! # Stages
//!
//! 1. **Row Reader** ([`read_rows`]): bytes to headers plus ordered raw rows
//! 2. **Timestamp Detection** ([`detect_timestamp_column`]): pick the time axis
//! 3. **Type Inference** ([`infer_types`]): tag every other column
//! 4. **Normalization** ([`normalize_rows`]): raw rows to sparse records
//!
//! [`prepare_upload`] runs all four over a single read of the file.
//!
//! # Example
//!
//! ```
//! use csvts_ingest::prepare_upload;
//! use csvts_model::TypeTag;
//!
//! let csv = b"time,temp,label\n2024-01-01T00:00,21.5,ok\n2024-01-01T01:00,,bad\n";
//! let prepared = prepare_upload(csv).unwrap();
//!
//! assert_eq!(prepared.schema.timestamp_column, "time");
//! assert_eq!(prepared.schema.type_of("temp"), Some(TypeTag::Float));
//! assert_eq!(prepared.records.len(), 2);
//! ```

mod datetime;
mod detect;
mod error;
mod infer;
mod normalize;
mod reader;

use csvts_model::ObservationRecord;

// === Error Types ===
pub use error::{IngestError, Result};

// === Row Reading ===
pub use reader::{RawRow, RawTable, read_rows, read_rows_from_str};

// === Date/Time Parsing ===
pub use datetime::{is_observation_time, parse_observation_time};

// === Schema Inference ===
pub use detect::{TimestampColumn, detect_timestamp_column};
pub use infer::{InferredSchema, classify_value, infer_types};

// === Normalization ===
pub use normalize::{NULL_LITERAL, NormalizeStats, NormalizedRows, is_missing, normalize_rows};

/// Everything needed to persist one upload.
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub schema: InferredSchema,
    pub records: Vec<ObservationRecord>,
    pub stats: NormalizeStats,
}

/// Reads, detects, infers, and normalizes an uploaded file.
///
/// All stages observe the same row sequence.
pub fn prepare_upload(bytes: &[u8]) -> Result<PreparedUpload> {
    let table = read_rows(bytes)?;
    let timestamp = detect_timestamp_column(&table)?;
    let schema = infer_types(&table, &timestamp);
    let NormalizedRows { records, stats } = normalize_rows(&table, &timestamp)?;

    Ok(PreparedUpload {
        schema,
        records,
        stats,
    })
}
