//! Sparse observation records and time windows.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One stored row of an upload.
///
/// The (upload, `observed_at`) pair is unique. `fields` holds only headers
/// that had a value in the source row, as the raw strings that were read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Parsed value of the timestamp column.
    pub observed_at: NaiveDateTime,
    /// Non-timestamp header name to raw value.
    pub fields: BTreeMap<String, String>,
}

impl ObservationRecord {
    pub fn new(observed_at: NaiveDateTime, fields: BTreeMap<String, String>) -> Self {
        Self {
            observed_at,
            fields,
        }
    }

    /// Raw value for a header, if present in this record.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields.get(header).map(String::as_str)
    }
}

/// Inclusive time bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    /// A window matching every time.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns true if neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Returns true if `start <= at <= end` for the bounds that are set.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start.is_none_or(|start| start <= at) && self.end.is_none_or(|end| at <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_window_inclusive_bounds() {
        let window = TimeWindow::new(Some(at(1)), Some(at(3)));
        assert!(!window.contains(at(0)));
        assert!(window.contains(at(1)));
        assert!(window.contains(at(2)));
        assert!(window.contains(at(3)));
        assert!(!window.contains(at(4)));
    }

    #[test]
    fn test_window_open_sides() {
        assert!(TimeWindow::new(None, Some(at(2))).contains(at(0)));
        assert!(!TimeWindow::new(None, Some(at(2))).contains(at(3)));
        assert!(TimeWindow::new(Some(at(2)), None).contains(at(23)));
        assert!(TimeWindow::unbounded().is_unbounded());
    }

    #[test]
    fn test_record_get() {
        let mut fields = BTreeMap::new();
        fields.insert("label".to_string(), "bad".to_string());
        let record = ObservationRecord::new(at(1), fields);
        assert_eq!(record.get("label"), Some("bad"));
        assert_eq!(record.get("temp"), None);
    }
}
