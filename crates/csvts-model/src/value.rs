//! Raw stored values typed against header metadata.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::TypeTag;

/// A stored value after typing against its header's [`TypeTag`].
///
/// Typing never fails: a raw value that does not fit its tag is kept as
/// [`TypedValue::Str`] so nothing read from the source is lost.
///
/// Typed values are a presentation of the stored string, not a replacement
/// for it. Numbers are normalized (`"007"` under `int` displays as `7`); the
/// raw string stays in the record and is what CSV export writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Str(String),
}

impl TypedValue {
    /// Types `raw` against `tag`.
    pub fn coerce(raw: &str, tag: TypeTag) -> Self {
        let trimmed = raw.trim();
        match tag {
            TypeTag::Int => trimmed
                .parse::<i64>()
                .map(Self::Int)
                .unwrap_or_else(|_| Self::Str(raw.to_string())),
            TypeTag::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Float)
                .unwrap_or_else(|| Self::Str(raw.to_string())),
            TypeTag::Timestamp => trimmed
                .parse::<NaiveDateTime>()
                .map(Self::Timestamp)
                .unwrap_or_else(|_| Self::Str(raw.to_string())),
            TypeTag::Str => Self::Str(raw.to_string()),
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Timestamp(_) | Self::Str(_) => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            Self::Str(v) => f.write_str(v),
        }
    }
}
