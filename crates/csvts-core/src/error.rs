//! Service error types.
//!
//! Every failure of an ingestion or query is a [`ServiceError`]. The
//! underlying stage errors are kept as sources so callers can match on them.

use csvts_ingest::IngestError;
use csvts_model::UploadId;
use csvts_store::{BlobError, StoreError};
use thiserror::Error;

use crate::config::ConfigError;

/// Ingestion or query failure.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Only `.csv` files are accepted.
    #[error("unsupported file type: '{file_name}' (expected a .csv file)")]
    UnsupportedFileType { file_name: String },

    /// The upload exceeds the configured size limit.
    #[error("file is {size} bytes, larger than the {max} byte limit")]
    FileTooLarge { size: u64, max: u64 },

    /// The file could not be turned into records.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The observation store failed; nothing from this call was persisted.
    #[error("storage failure")]
    Storage(#[from] StoreError),

    /// Archiving or reading a raw upload failed.
    #[error("blob storage failure")]
    BlobStorage(#[from] BlobError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Aggregation over a header the upload does not declare.
    #[error("upload has no header named '{field}'")]
    UnknownField { field: String },

    /// Writing CSV output failed.
    #[error("failed to write CSV output")]
    Export {
        #[source]
        source: csv::Error,
    },

    /// A blocking worker panicked or was cancelled.
    #[error("background task failed")]
    TaskJoin {
        #[source]
        source: tokio::task::JoinError,
    },
}

impl ServiceError {
    /// Returns true if the requested upload does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_not_found())
    }

    /// The missing upload, for not-found errors.
    pub fn missing_upload(&self) -> Option<UploadId> {
        match self {
            Self::Storage(StoreError::UploadNotFound { id }) => Some(*id),
            _ => None,
        }
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedFileType { file_name } => {
                format!("'{file_name}' is not a CSV file. Only .csv uploads are accepted.")
            }
            Self::FileTooLarge { size, max } => {
                format!("The file is {size} bytes, which exceeds the limit of {max} bytes.")
            }
            Self::Ingest(IngestError::Decoding { valid_up_to, .. }) => {
                format!("The file is not valid UTF-8 text (first bad byte at offset {valid_up_to}).")
            }
            Self::Ingest(IngestError::NoTimestampColumn { .. }) => {
                "No column in the file contains dates or times.".to_string()
            }
            Self::Ingest(IngestError::DuplicateObservationTime {
                observed_at, line, ..
            }) => {
                format!("Line {line} repeats the observation time {observed_at}.")
            }
            Self::Storage(StoreError::UploadNotFound { id }) => {
                format!("Upload {id} does not exist.")
            }
            Self::Storage(err) => format!("The data store reported an error: {err}"),
            Self::BlobStorage(err) => format!("The uploaded file could not be archived: {err}"),
            Self::Config(err) => err.to_string(),
            Self::UnknownField { field } => format!("The upload has no column named '{field}'."),
            Self::Export { .. } => "The CSV output could not be written.".to_string(),
            Self::TaskJoin { .. } => "The operation was interrupted.".to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::UnsupportedFileType { .. } => Some("Export the data as CSV and retry.".into()),
            Self::FileTooLarge { .. } => {
                Some("Split the file or raise max_file_size in the configuration.".into())
            }
            Self::Ingest(IngestError::Decoding { .. }) => {
                Some("Re-save the file with UTF-8 encoding.".into())
            }
            Self::Ingest(IngestError::NoTimestampColumn { .. }) => Some(
                "Make sure the first date column has a date in its first non-empty cell.".into(),
            ),
            Self::Ingest(IngestError::DuplicateObservationTime { .. }) => {
                Some("Each row needs a distinct timestamp; remove or merge repeated rows.".into())
            }
            Self::Storage(StoreError::UploadNotFound { .. }) => {
                Some("List the available uploads and check the identifier.".into())
            }
            Self::BlobStorage(BlobError::Unsupported { .. }) => Some(
                "Set storage_kind to local or disable archive_uploads in the configuration.".into(),
            ),
            _ => None,
        }
    }
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
