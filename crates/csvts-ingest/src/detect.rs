//! Observation-time column detection.

use crate::datetime::is_observation_time;
use crate::error::{IngestError, Result};
use crate::reader::RawTable;

/// The column chosen as the observation-time axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampColumn {
    /// Header name.
    pub name: String,
    /// Position of the header's first declaration.
    pub position: usize,
}

/// Picks the observation-time column.
///
/// Headers are tried in declared order. For each, only the first non-blank
/// value is sampled; the first header whose sample parses as a date/time wins
/// and later headers are not examined. A column that starts with date-like
/// values but later holds text can still be chosen.
pub fn detect_timestamp_column(table: &RawTable) -> Result<TimestampColumn> {
    for (position, name) in table.unique_headers() {
        let Some(sample) = first_non_blank(table, name) else {
            tracing::trace!(header = name, "no non-blank sample");
            continue;
        };

        if is_observation_time(sample) {
            tracing::debug!(header = name, position, "detected observation time column");
            return Ok(TimestampColumn {
                name: name.to_string(),
                position,
            });
        }
    }

    Err(IngestError::NoTimestampColumn {
        header_count: table.headers.len(),
    })
}

/// First value of `header` that is not empty after trimming, in row order.
pub(crate) fn first_non_blank<'a>(table: &'a RawTable, header: &str) -> Option<&'a str> {
    table
        .rows
        .iter()
        .filter_map(|row| table.value(row, header))
        .find(|value| !value.trim().is_empty())
}
