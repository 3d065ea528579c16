//! Row normalization into sparse observation records.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use csvts_model::ObservationRecord;

use crate::datetime::parse_observation_time;
use crate::detect::TimestampColumn;
use crate::error::{IngestError, Result};
use crate::reader::RawTable;

/// Literal that marks a missing value in source files.
pub const NULL_LITERAL: &str = "null";

/// Per-upload row accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Data rows read.
    pub total_rows: usize,
    /// Rows dropped because the timestamp did not parse (or was missing).
    pub invalid_timestamp: usize,
    /// Rows dropped because no field besides the timestamp had a value.
    pub empty_rows: usize,
    /// Rows turned into records.
    pub kept: usize,
}

/// Records produced from one upload, in file order.
#[derive(Debug, Clone, Default)]
pub struct NormalizedRows {
    pub records: Vec<ObservationRecord>,
    pub stats: NormalizeStats,
}

/// Returns true if a raw value counts as "no value".
pub fn is_missing(value: &str) -> bool {
    value.is_empty() || value == NULL_LITERAL
}

/// Converts every row of `table` into a sparse record.
///
/// Rows whose timestamp fails to parse, and rows with nothing but a
/// timestamp, are dropped without error. Two kept rows with the same
/// observation time fail the whole upload.
pub fn normalize_rows(table: &RawTable, timestamp: &TimestampColumn) -> Result<NormalizedRows> {
    let mut stats = NormalizeStats {
        total_rows: table.len(),
        ..NormalizeStats::default()
    };
    let mut records = Vec::with_capacity(table.len());
    let mut seen: HashMap<NaiveDateTime, u64> = HashMap::with_capacity(table.len());

    for row in &table.rows {
        let Some(observed_at) = table
            .value(row, &timestamp.name)
            .and_then(parse_observation_time)
        else {
            stats.invalid_timestamp += 1;
            tracing::trace!(line = row.line, "dropping row with unparseable timestamp");
            continue;
        };

        let fields: BTreeMap<String, String> = table
            .pairs(row)
            .filter(|(name, value)| *name != timestamp.name && !is_missing(value))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        if fields.is_empty() {
            stats.empty_rows += 1;
            tracing::trace!(line = row.line, "dropping row with no field values");
            continue;
        }

        if let Some(&first_line) = seen.get(&observed_at) {
            return Err(IngestError::DuplicateObservationTime {
                column: timestamp.name.clone(),
                observed_at,
                first_line,
                line: row.line,
            });
        }
        seen.insert(observed_at, row.line);

        records.push(ObservationRecord::new(observed_at, fields));
    }

    stats.kept = records.len();
    tracing::debug!(
        total = stats.total_rows,
        kept = stats.kept,
        invalid_timestamp = stats.invalid_timestamp,
        empty = stats.empty_rows,
        "normalized rows"
    );

    Ok(NormalizedRows { records, stats })
}
