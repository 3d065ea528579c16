//! Upload identity and provenance.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric identifier of one ingestion run.
///
/// Assigned by the store when the upload is created and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(pub u64);

impl UploadId {
    /// Returns the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UploadId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for UploadId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// One accepted file.
///
/// Created once per ingestion and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    /// Store-assigned identifier.
    pub id: UploadId,
    /// When the upload record was created.
    pub created_at: DateTime<Utc>,
    /// Original file name as supplied by the client (lower-cased).
    pub file_name: String,
    /// Network address of the client that sent the file.
    pub client_address: String,
}

impl Upload {
    /// Creates an upload stamped with the current time.
    pub fn new(id: UploadId, file_name: impl Into<String>, client_address: impl Into<String>) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            file_name: file_name.into(),
            client_address: client_address.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_id_parse_and_display() {
        let id: UploadId = " 42 ".parse().unwrap();
        assert_eq!(id, UploadId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<UploadId>().is_err());
    }

    #[test]
    fn test_upload_id_serializes_as_number() {
        let json = serde_json::to_string(&UploadId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
