//! Row reader: uploaded bytes to ordered raw rows.

use std::collections::HashMap;

use csv::ReaderBuilder;

use crate::error::{IngestError, Result};

/// One CSV data line as read, before any interpretation.
///
/// Values are positional against [`RawTable::headers`]. A row may be shorter
/// than the header list (trailing keys are missing) or longer (extra fields
/// have no header and are never looked up).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based source line where the record starts.
    pub line: u64,
    /// Field values in source order.
    pub values: Vec<String>,
}

impl RawRow {
    /// Value at a column position, if the row has one.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }
}

/// Header list plus every data row of one upload, in source order.
///
/// Read once per upload; detection, inference, and normalization all walk this
/// same sequence.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names exactly as declared on the first line.
    pub headers: Vec<String>,
    /// Data rows in file order.
    pub rows: Vec<RawRow>,
    lookup: HashMap<String, usize>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        // A repeated header name resolves to its last column.
        let lookup = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self {
            headers,
            rows,
            lookup,
        }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index that supplies values for `header`.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.lookup.get(header).copied()
    }

    /// Header names in declared order with each name listed once, paired with
    /// the position of its first declaration.
    pub fn unique_headers(&self) -> Vec<(usize, &str)> {
        let mut seen = std::collections::HashSet::new();
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, name)| seen.insert(name.as_str()))
            .map(|(idx, name)| (idx, name.as_str()))
            .collect()
    }

    /// Value of `header` in `row`, or `None` if the row is too short.
    pub fn value<'a>(&self, row: &'a RawRow, header: &str) -> Option<&'a str> {
        self.column_index(header).and_then(|idx| row.get(idx))
    }

    /// Iterates the (header, value) pairs present in `row`.
    ///
    /// A repeated header yields only its last column's value.
    pub fn pairs<'a>(&'a self, row: &'a RawRow) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.unique_headers()
            .into_iter()
            .filter_map(move |(_, name)| self.value(row, name).map(|value| (name, value)))
    }
}

/// Decodes uploaded bytes and reads them as CSV.
///
/// The first line is the header. A leading UTF-8 BOM is ignored. Field counts
/// are not validated. Decoding is the only failure.
pub fn read_rows(bytes: &[u8]) -> Result<RawTable> {
    let text = std::str::from_utf8(bytes).map_err(|source| IngestError::Decoding {
        valid_up_to: source.valid_up_to(),
        source,
    })?;
    Ok(read_rows_from_str(text))
}

/// Reads already-decoded CSV text.
///
/// Structure never fails the read: field-count mismatches pass through and
/// stray quotes are kept as literal characters. A record the reader cannot
/// return is logged and skipped.
pub fn read_rows_from_str(text: &str) -> RawTable {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records().filter_map(|result| {
        result
            .inspect_err(|err| tracing::warn!(error = %err, "skipping unreadable CSV record"))
            .ok()
    });

    let headers: Vec<String> = match records.next() {
        Some(first) => first.iter().map(str::to_string).collect(),
        None => return RawTable::default(),
    };

    let mut rows = Vec::new();
    for record in records {
        let line = record.position().map(csv::Position::line).unwrap_or_default();
        rows.push(RawRow {
            line,
            values: record.iter().map(str::to_string).collect(),
        });
    }

    tracing::debug!(
        headers = headers.len(),
        rows = rows.len(),
        "read CSV rows"
    );

    RawTable::new(headers, rows)
}
