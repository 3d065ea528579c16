//! Inferred column types and per-header metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Type assigned to a column during inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    /// The observation-time column.
    Timestamp,
    /// Digits only.
    Int,
    /// Digits with at most one decimal point.
    Float,
    /// Anything else.
    Str,
}

impl TypeTag {
    /// Get the lowercase tag name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
        }
    }

    /// Whether values of this type can be aggregated numerically.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timestamp" => Ok(Self::Timestamp),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "str" => Ok(Self::Str),
            other => Err(format!("unknown type tag '{other}'")),
        }
    }
}

/// Schema entry for one column of an upload.
///
/// Keyed by (upload, header name) in storage; at most one entry per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMetadata {
    /// Column name as declared in the CSV header line.
    pub header_name: String,
    /// Inferred type.
    pub type_tag: TypeTag,
    /// Zero-based position of the column in the declared header order.
    pub position: usize,
}

impl HeaderMetadata {
    pub fn new(header_name: impl Into<String>, type_tag: TypeTag, position: usize) -> Self {
        Self {
            header_name: header_name.into(),
            type_tag,
            position,
        }
    }

    /// Whether this entry describes the observation-time column.
    #[must_use]
    pub fn is_timestamp(&self) -> bool {
        self.type_tag == TypeTag::Timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_round_trip_names() {
        for tag in [TypeTag::Timestamp, TypeTag::Int, TypeTag::Float, TypeTag::Str] {
            assert_eq!(tag.as_str().parse::<TypeTag>().unwrap(), tag);
        }
        assert!("bool".parse::<TypeTag>().is_err());
    }

    #[test]
    fn test_type_tag_serde_lowercase() {
        let json = serde_json::to_string(&TypeTag::Float).unwrap();
        assert_eq!(json, "\"float\"");
    }

    #[test]
    fn test_numeric_tags() {
        assert!(TypeTag::Int.is_numeric());
        assert!(TypeTag::Float.is_numeric());
        assert!(!TypeTag::Str.is_numeric());
        assert!(!TypeTag::Timestamp.is_numeric());
    }
}
