//! Ledger record types and status definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Row identifier assigned by the ledger at insert time.
///
/// Identifiers increase monotonically, so ordering by id is ordering by
/// creation.
pub type RecordId = i64;

/// Lifecycle state of a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Waiting to be fetched.
    Pending,
    /// Fetched and written to its final path.
    Success,
    /// Fetch failed; terminal, never retried within a run.
    Failed,
}

impl RecordStatus {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Returns true for `Success` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid record status: {s}")),
        }
    }
}

/// A record to be inserted: the raw URL and the filename derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub url: String,
    pub filename: String,
}

impl NewRecord {
    #[must_use]
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }
}

/// One extracted URL tracked through a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlRecord {
    /// Creation-ordered identifier.
    pub id: RecordId,
    /// Full source URL. Not unique across records.
    pub url: String,
    /// Target filename, rewritten at most once by collision resolution.
    pub filename: String,
    /// Current lifecycle state.
    pub status: RecordStatus,
}

impl fmt::Display for UrlRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UrlRecord {{ id: {}, filename: {}, status: {} }}",
            self.id, self.filename, self.status
        )
    }
}

/// A single filename rewrite produced by collision resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub id: RecordId,
    pub filename: String,
}

/// Changes the filename resolver wants applied to the ledger as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Malformed captures to remove.
    pub dropped: Vec<RecordId>,
    /// Collision renames, in the order they were assigned.
    pub renames: Vec<Rename>,
}

impl Resolution {
    /// Returns true when applying this resolution would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dropped.is_empty() && self.renames.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_status_as_str() {
        assert_eq!(RecordStatus::Pending.as_str(), "pending");
        assert_eq!(RecordStatus::Success.as_str(), "success");
        assert_eq!(RecordStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_record_status_from_str_valid() {
        for status in [
            RecordStatus::Pending,
            RecordStatus::Success,
            RecordStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<RecordStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_record_status_from_str_invalid() {
        let result = "completed".parse::<RecordStatus>();
        assert!(result.unwrap_err().contains("invalid record status"));
    }

    #[test]
    fn test_record_status_terminal() {
        assert!(!RecordStatus::Pending.is_terminal());
        assert!(RecordStatus::Success.is_terminal());
        assert!(RecordStatus::Failed.is_terminal());
    }

    #[test]
    fn test_record_status_serializes_snake_case() {
        let json = serde_json::to_string(&RecordStatus::Success).unwrap();
        assert_eq!(json, "\"success\"");
    }

    #[test]
    fn test_url_record_display() {
        let record = UrlRecord {
            id: 7,
            url: "https://cdn.discordapp.com/a/1/x.png".to_string(),
            filename: "x.png".to_string(),
            status: RecordStatus::Pending,
        };
        let display = record.to_string();
        assert!(display.contains('7'));
        assert!(display.contains("x.png"));
        assert!(display.contains("pending"));
    }

    #[test]
    fn test_resolution_is_empty() {
        assert!(Resolution::default().is_empty());
        let resolution = Resolution {
            dropped: vec![1],
            renames: Vec::new(),
        };
        assert!(!resolution.is_empty());
    }
}
