//! Permissive date/time parsing for observation times.
//!
//! Source files come from anywhere, so this accepts the common ISO 8601
//! shapes, slash and dotted locale forms, and textual month names. Values with
//! a UTC offset are converted to UTC; everything else is taken as naive local
//! time. Date-only values resolve to midnight.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Full date-time formats, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%b-%Y %H:%M:%S", // 15-Jan-2024 10:30:00
    "%d-%b-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S", // European
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S", // US
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Date-time formats carrying an explicit offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Date-only formats, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%b-%Y",  // 15-Jan-2024
    "%d-%B-%Y",  // 15-January-2024
    "%d/%m/%Y",  // European: 15/01/2024
    "%m/%d/%Y",  // US: 01/15/2024
    "%d.%m.%Y",  // German: 15.01.2024
    "%Y%m%d",    // Compact: 20240115
    "%b %d, %Y", // Jan 15, 2024
    "%B %d, %Y", // January 15, 2024
    "%d %b %Y",  // 15 Jan 2024
    "%d %B %Y",  // 15 January 2024
    "%Y-%b-%d",  // 2024-Jan-15
    "%d-%m-%Y",  // 15-01-2024
];

/// Parses an observation time, returning `None` if no known format matches.
pub fn parse_observation_time(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    try_parse_with_offset(trimmed)
        .or_else(|| try_parse_datetime(trimmed))
        .or_else(|| try_parse_date(trimmed).map(|d| d.and_time(NaiveTime::MIN)))
}

/// Returns true if `value` parses as an observation time.
pub fn is_observation_time(value: &str) -> bool {
    parse_observation_time(value).is_some()
}

/// Try RFC 3339 and other offset-carrying formats, normalized to UTC.
fn try_parse_with_offset(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.naive_utc())
}

/// Try to parse full datetime formats.
fn try_parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Try to parse date-only formats.
fn try_parse_date(value: &str) -> Option<NaiveDate> {
    // Compact dates must be exactly eight digits; shorter digit runs are
    // numbers, not dates.
    if value.bytes().all(|b| b.is_ascii_digit()) && value.len() != 8 {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}
