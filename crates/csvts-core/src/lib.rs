//! Ingestion and query services for time-series CSV uploads.
//!
//! [`ingest`] guards, archives, parses and persists one file as a unit.
//! [`query`] reads an upload back for a time window, and [`TableView`] turns
//! the result into typed rows, dense rows, or CSV. [`aggregate`] summarizes a
//! numeric column per day, ISO week, or month.
//!
//! # Example
//!
//! ```
//! use csvts_core::{ServiceConfig, TableView, ingest, query};
//! use csvts_model::TimeWindow;
//! use csvts_store::MemoryStore;
//!
//! let config = ServiceConfig { archive_uploads: false, ..ServiceConfig::default() };
//! let store = MemoryStore::new();
//! let csv = b"time,temp\n2024-01-01T00:00,21.5\n2024-01-01T01:00,22.0\n";
//!
//! let report = ingest(&config, &store, "temps.csv", "127.0.0.1", csv).unwrap();
//! let result = query(&store, report.upload_id(), &TimeWindow::unbounded()).unwrap();
//! assert_eq!(result.total_count, 2);
//!
//! let table = TableView::from(result);
//! assert_eq!(table.columns(), vec!["time", "temp"]);
//! ```

mod aggregate;
mod config;
mod error;
mod service;
mod table;

// === Configuration ===
pub use config::{ConfigError, DEFAULT_MAX_FILE_SIZE, ServiceConfig, StorageKind};

// === Error Types ===
pub use error::{Result, ServiceError};

// === Services ===
pub use service::{IngestReport, QueryResult, ingest, ingest_async, query, query_async};

// === Presentation ===
pub use aggregate::{AggregatePoint, AggregationKind, Bucket, aggregate};
pub use table::{DEFAULT_TIME_COLUMN, TableView, TypedRow};
