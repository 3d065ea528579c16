//! Rebuilding rectangular tables from sparse records.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::NaiveDateTime;
use csvts_model::{HeaderMetadata, ObservationRecord, TypeTag, TypedValue};
use serde::Serialize;

use crate::error::{Result, ServiceError};
use crate::service::QueryResult;

/// Column label used when an upload carries no timestamp metadata.
pub const DEFAULT_TIME_COLUMN: &str = "time";

/// One record with every value typed against its header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedRow {
    pub observed_at: NaiveDateTime,
    pub values: BTreeMap<String, TypedValue>,
}

/// Query output arranged as a table: the timestamp column first, then the
/// remaining headers in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    timestamp_column: String,
    value_headers: Vec<HeaderMetadata>,
    records: Vec<ObservationRecord>,
}

impl From<QueryResult> for TableView {
    fn from(result: QueryResult) -> Self {
        Self::new(result.header_metadata, result.records)
    }
}

impl TableView {
    pub fn new(header_metadata: Vec<HeaderMetadata>, records: Vec<ObservationRecord>) -> Self {
        let mut timestamp_column = None;
        let mut value_headers = Vec::with_capacity(header_metadata.len());
        for header in header_metadata {
            if header.is_timestamp() && timestamp_column.is_none() {
                timestamp_column = Some(header.header_name);
            } else {
                value_headers.push(header);
            }
        }
        value_headers.sort_by_key(|h| h.position);

        Self {
            timestamp_column: timestamp_column.unwrap_or_else(|| DEFAULT_TIME_COLUMN.to_string()),
            value_headers,
            records,
        }
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    /// Column names in output order.
    pub fn columns(&self) -> Vec<&str> {
        std::iter::once(self.timestamp_column.as_str())
            .chain(self.value_headers.iter().map(|h| h.header_name.as_str()))
            .collect()
    }

    /// Non-timestamp headers in declared order.
    pub fn value_headers(&self) -> &[HeaderMetadata] {
        &self.value_headers
    }

    pub fn records(&self) -> &[ObservationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Tag of a non-timestamp header.
    pub fn type_of(&self, header: &str) -> Option<TypeTag> {
        self.value_headers
            .iter()
            .find(|h| h.header_name == header)
            .map(|h| h.type_tag)
    }

    /// Every record with its values typed. Fields without metadata stay strings.
    pub fn typed_rows(&self) -> Vec<TypedRow> {
        self.records
            .iter()
            .map(|record| TypedRow {
                observed_at: record.observed_at,
                values: record
                    .fields
                    .iter()
                    .map(|(name, raw)| {
                        let tag = self.type_of(name).unwrap_or(TypeTag::Str);
                        (name.clone(), TypedValue::coerce(raw, tag))
                    })
                    .collect(),
            })
            .collect()
    }

    /// One cell per column of [`columns`](Self::columns); `None` where the
    /// record has no value.
    pub fn dense_rows(&self) -> Vec<Vec<Option<TypedValue>>> {
        self.records
            .iter()
            .map(|record| {
                let mut row = Vec::with_capacity(self.value_headers.len() + 1);
                row.push(Some(TypedValue::Timestamp(record.observed_at)));
                row.extend(self.value_headers.iter().map(|header| {
                    record
                        .get(&header.header_name)
                        .map(|raw| TypedValue::coerce(raw, header.type_tag))
                }));
                row
            })
            .collect()
    }

    /// Writes the table as CSV with raw values; absent values are empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer
            .write_record(self.columns())
            .map_err(|source| ServiceError::Export { source })?;

        for record in &self.records {
            let time = TypedValue::Timestamp(record.observed_at).to_string();
            let row = std::iter::once(time.as_str()).chain(
                self.value_headers
                    .iter()
                    .map(|header| record.get(&header.header_name).unwrap_or_default()),
            );
            csv_writer
                .write_record(row)
                .map_err(|source| ServiceError::Export { source })?;
        }

        csv_writer.flush().map_err(|e| ServiceError::Export {
            source: csv::Error::from(e),
        })
    }

    /// CSV export as a string.
    pub fn to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
