//! Data model types for time-series CSV uploads.
//!
//! This crate provides the shared vocabulary used by ingestion, storage, and
//! reconstruction:
//!
//! - [`Upload`]: one accepted file and its provenance
//! - [`HeaderMetadata`] and [`TypeTag`]: the inferred schema of an upload
//! - [`ObservationRecord`]: one sparse row keyed by its observation time
//! - [`TimeWindow`]: inclusive time bounds used by queries
//! - [`TypedValue`]: a stored raw value typed against its header's tag
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use chrono::NaiveDate;
//! use csvts_model::{ObservationRecord, TimeWindow};
//!
//! let at = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let mut fields = BTreeMap::new();
//! fields.insert("temp".to_string(), "21.5".to_string());
//! let record = ObservationRecord::new(at, fields);
//!
//! assert!(TimeWindow::unbounded().contains(record.observed_at));
//! ```

mod header;
mod record;
mod upload;
mod value;

pub use header::{HeaderMetadata, TypeTag};
pub use record::{ObservationRecord, TimeWindow};
pub use upload::{Upload, UploadId};
pub use value::TypedValue;
