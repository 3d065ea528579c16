//! Column type inference.
//!
//! Each non-timestamp column takes the type of its first non-blank value and
//! keeps it: later values never widen or revise the tag. A column tagged `int`
//! that later holds `"abc"` stays `int`, and the mismatched value is still
//! stored as read. Columns with no non-blank value get no tag at all.

use std::collections::HashMap;

use csvts_model::{HeaderMetadata, TypeTag};
use serde::{Deserialize, Serialize};

use crate::detect::TimestampColumn;
use crate::reader::RawTable;

/// Result of schema inference for one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSchema {
    /// Name of the observation-time column.
    pub timestamp_column: String,
    /// One entry per tagged column (timestamp column included), in declared order.
    pub headers: Vec<HeaderMetadata>,
}

impl InferredSchema {
    /// Tag assigned to `header`, if it received one.
    pub fn type_of(&self, header: &str) -> Option<TypeTag> {
        self.headers
            .iter()
            .find(|h| h.header_name == header)
            .map(|h| h.type_tag)
    }

    /// Tags keyed by header name.
    pub fn type_map(&self) -> HashMap<&str, TypeTag> {
        self.headers
            .iter()
            .map(|h| (h.header_name.as_str(), h.type_tag))
            .collect()
    }
}

/// Classifies a single non-blank value.
///
/// - `int`: ASCII digits only
/// - `float`: digits with exactly one `.` removed still all digits
/// - `str`: anything else (including signs and exponents)
pub fn classify_value(value: &str) -> TypeTag {
    let value = value.trim();
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return TypeTag::Int;
    }
    let without_point = value.replacen('.', "", 1);
    if !without_point.is_empty() && without_point.bytes().all(|b| b.is_ascii_digit()) {
        return TypeTag::Float;
    }
    TypeTag::Str
}

/// Assigns a type tag to every column of `table`.
///
/// The timestamp column is pinned to [`TypeTag::Timestamp`].
pub fn infer_types(table: &RawTable, timestamp: &TimestampColumn) -> InferredSchema {
    let mut headers = Vec::with_capacity(table.headers.len());

    for (position, name) in table.unique_headers() {
        if name == timestamp.name {
            headers.push(HeaderMetadata::new(name, TypeTag::Timestamp, position));
            continue;
        }

        let tag = table
            .rows
            .iter()
            .filter_map(|row| table.value(row, name))
            .find(|value| !value.trim().is_empty())
            .map(classify_value);

        match tag {
            Some(tag) => {
                tracing::trace!(header = name, %tag, "inferred column type");
                headers.push(HeaderMetadata::new(name, tag, position));
            }
            None => tracing::debug!(header = name, "column has no values; left untyped"),
        }
    }

    InferredSchema {
        timestamp_column: timestamp.name.clone(),
        headers,
    }
}
