//! Error types for CSV ingestion.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors that can occur while turning uploaded bytes into records.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Uploaded bytes are not valid UTF-8 text.
    #[error("file is not valid UTF-8 text (invalid byte at offset {valid_up_to})")]
    Decoding {
        valid_up_to: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    /// No column produced a parseable date/time sample.
    #[error("no valid observation time column found among {header_count} headers")]
    NoTimestampColumn { header_count: usize },

    /// Two rows of the same upload share an observation time.
    #[error(
        "duplicate observation time {observed_at} in column '{column}' (lines {first_line} and {line})"
    )]
    DuplicateObservationTime {
        column: String,
        observed_at: NaiveDateTime,
        first_line: u64,
        line: u64,
    },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
