//! Time-bucket aggregation of one numeric column.
//!
//! Every record in the view lands in exactly one bucket. A value that is
//! absent or does not parse as a number counts as `0`, so `count` is the
//! number of records in the period, not the number of numeric values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::table::TableView;

/// Statistic computed per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    #[default]
    Sum,
    Mean,
    Median,
}

/// Period length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    #[default]
    Daily,
    /// ISO weeks, Monday to Sunday.
    Weekly,
    Monthly,
}

/// Aggregate of one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatePoint {
    /// `YYYY-MM-DD`, `YYYY-MM-DD_YYYY-MM-DD`, or `YYYY-MM`.
    pub period: String,
    pub value: f64,
    pub count: usize,
}

impl AggregationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
        }
    }

    fn apply(self, values: &mut [f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let sum: f64 = values.iter().sum();
        match self {
            Self::Sum => sum,
            Self::Mean => sum / values.len() as f64,
            Self::Median => {
                values.sort_by(f64::total_cmp);
                let mid = values.len() / 2;
                if values.len() % 2 == 1 {
                    values[mid]
                } else {
                    (values[mid - 1] + values[mid]) / 2.0
                }
            }
        }
    }
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Label of the period containing `at`.
    pub fn period_of(self, at: NaiveDateTime) -> String {
        let date = at.date();
        match self {
            Self::Daily => date.format("%Y-%m-%d").to_string(),
            Self::Weekly => {
                let start = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                let end = start + Duration::days(6);
                format!("{}_{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
            }
            Self::Monthly => date.format("%Y-%m").to_string(),
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            other => Err(format!(
                "unknown aggregation '{other}' (expected sum, mean, or median)"
            )),
        }
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!(
                "unknown bucket '{other}' (expected daily, weekly, or monthly)"
            )),
        }
    }
}

/// Numeric reading of a raw value; anything else is `0`.
///
/// Reads the longest leading decimal number, so `"12kWh"` counts as `12`.
fn numeric_or_zero(raw: Option<&str>) -> f64 {
    raw.and_then(|value| leading_number(value.trim_start()))
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Parses `[+-]digits[.digits][(e|E)[+-]digits]` from the start of `text`.
fn leading_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer = digits_from(end);
    end += integer;
    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits_from(end + 1);
        if integer > 0 || fraction > 0 {
            end += 1 + fraction;
        }
    }
    if integer == 0 && fraction == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent = digits_from(end + 1 + sign);
        if exponent > 0 {
            end += 1 + sign + exponent;
        }
    }
    text[..end].parse().ok()
}

/// Aggregates `field` over the records of `view`, one point per period,
/// ordered by period.
pub fn aggregate(
    view: &TableView,
    field: &str,
    kind: AggregationKind,
    bucket: Bucket,
) -> Result<Vec<AggregatePoint>> {
    if view.type_of(field).is_none() {
        return Err(ServiceError::UnknownField {
            field: field.to_string(),
        });
    }

    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in view.records() {
        grouped
            .entry(bucket.period_of(record.observed_at))
            .or_default()
            .push(numeric_or_zero(record.get(field)));
    }

    let points: Vec<AggregatePoint> = grouped
        .into_iter()
        .map(|(period, mut values)| AggregatePoint {
            value: kind.apply(&mut values),
            count: values.len(),
            period,
        })
        .collect();
    tracing::debug!(field, %kind, %bucket, periods = points.len(), "aggregated");
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use csvts_model::{HeaderMetadata, ObservationRecord, TypeTag};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn view(points: &[(NaiveDateTime, Option<&str>)]) -> TableView {
        let records = points
            .iter()
            .map(|(time, value)| {
                let mut fields = BTreeMap::new();
                fields.insert("note".to_string(), "x".to_string());
                if let Some(value) = value {
                    fields.insert("v".to_string(), (*value).to_string());
                }
                ObservationRecord::new(*time, fields)
            })
            .collect();
        TableView::new(
            vec![
                HeaderMetadata::new("t", TypeTag::Timestamp, 0),
                HeaderMetadata::new("v", TypeTag::Float, 1),
                HeaderMetadata::new("note", TypeTag::Str, 2),
            ],
            records,
        )
    }

    #[test]
    fn test_daily_sum_counts_unparsable_as_zero() {
        let table = view(&[
            (at(2024, 1, 1), Some("1.5")),
            (at(2024, 1, 1) + Duration::hours(1), Some("abc")),
            (at(2024, 1, 2), None),
        ]);
        let points = aggregate(&table, "v", AggregationKind::Sum, Bucket::Daily).unwrap();
        assert_eq!(
            points,
            vec![
                AggregatePoint {
                    period: "2024-01-01".to_string(),
                    value: 1.5,
                    count: 2
                },
                AggregatePoint {
                    period: "2024-01-02".to_string(),
                    value: 0.0,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_numeric_prefix_counts() {
        assert_eq!(numeric_or_zero(Some("12kWh")), 12.0);
        assert_eq!(numeric_or_zero(Some(" -1.5e2 units")), -150.0);
        assert_eq!(numeric_or_zero(Some(".5")), 0.5);
        assert_eq!(numeric_or_zero(Some("3.")), 3.0);
        assert_eq!(numeric_or_zero(Some("7e")), 7.0);
        assert_eq!(numeric_or_zero(Some("kWh12")), 0.0);
        assert_eq!(numeric_or_zero(Some("-")), 0.0);
        assert_eq!(numeric_or_zero(Some("inf")), 0.0);
        assert_eq!(numeric_or_zero(None), 0.0);
    }

    #[test]
    fn test_weekly_iso_period_label() {
        // 2024-01-03 is a Wednesday.
        assert_eq!(
            Bucket::Weekly.period_of(at(2024, 1, 3)),
            "2024-01-01_2024-01-07"
        );
        assert_eq!(
            Bucket::Weekly.period_of(at(2024, 12, 31)),
            "2024-12-30_2025-01-05"
        );
    }

    #[test]
    fn test_monthly_median_even_count() {
        let table = view(&[
            (at(2024, 2, 1), Some("4")),
            (at(2024, 2, 10), Some("1")),
            (at(2024, 2, 20), Some("3")),
            (at(2024, 2, 28), Some("2")),
            (at(2024, 3, 1), Some("7")),
        ]);
        let points = aggregate(&table, "v", AggregationKind::Median, Bucket::Monthly).unwrap();
        assert_eq!(points[0].period, "2024-02");
        assert_eq!(points[0].value, 2.5);
        assert_eq!(points[1].value, 7.0);
    }

    #[test]
    fn test_mean() {
        let table = view(&[(at(2024, 5, 5), Some("2")), (at(2024, 5, 6), Some("4"))]);
        let points = aggregate(&table, "v", AggregationKind::Mean, Bucket::Monthly).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 3.0);
        assert_eq!(points[0].count, 2);
    }

    #[test]
    fn test_unknown_field() {
        let table = view(&[]);
        let err = aggregate(&table, "missing", AggregationKind::Sum, Bucket::Daily).unwrap_err();
        assert!(matches!(err, ServiceError::UnknownField { .. }));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("MEDIAN".parse::<AggregationKind>().unwrap(), AggregationKind::Median);
        assert_eq!("weekly".parse::<Bucket>().unwrap(), Bucket::Weekly);
        assert!("hourly".parse::<Bucket>().is_err());
    }
}
