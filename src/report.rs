//! End-of-run summary derived from ledger state.

use std::fmt;

use serde::Serialize;

use crate::ledger::{RecordStatus, UrlRecord};

/// Final counts for a run plus the URLs that could not be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Records in the ledger after filename resolution.
    pub total: usize,
    /// Records that ended as `Success`.
    pub succeeded: usize,
    /// Records that ended as `Failed`.
    pub failed: usize,
    /// Records still `Pending` (only non-zero if a worker panicked).
    pub pending: usize,
    /// Source URLs of failed records, in id order.
    pub failed_urls: Vec<String>,
}

impl Report {
    /// Builds a report from a full ledger scan.
    #[must_use]
    pub fn from_records(records: &[UrlRecord]) -> Self {
        let mut report = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            match record.status {
                RecordStatus::Success => report.succeeded += 1,
                RecordStatus::Failed => {
                    report.failed += 1;
                    report.failed_urls.push(record.url.clone());
                }
                RecordStatus::Pending => report.pending += 1,
            }
        }
        report
    }

    /// Returns true when nothing failed and nothing was left pending.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.pending == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files: {} downloaded, {} failed",
            self.total, self.succeeded, self.failed
        )?;
        if self.pending > 0 {
            write!(f, ", {} not attempted", self.pending)?;
        }
        for url in &self.failed_urls {
            write!(f, "\n  failed: {url}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(id: i64, status: RecordStatus) -> UrlRecord {
        UrlRecord {
            id,
            url: format!("https://cdn.discordapp.com/a/{id}/f{id}.png"),
            filename: format!("f{id}.png"),
            status,
        }
    }

    #[test]
    fn test_from_records_counts_each_status() {
        let report = Report::from_records(&[
            record(1, RecordStatus::Success),
            record(2, RecordStatus::Failed),
            record(3, RecordStatus::Success),
            record(4, RecordStatus::Pending),
        ]);
        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.pending, 1);
        assert_eq!(report.failed_urls, vec!["https://cdn.discordapp.com/a/2/f2.png"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_empty_report_is_clean() {
        let report = Report::from_records(&[]);
        assert_eq!(report, Report::default());
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "0 files: 0 downloaded, 0 failed");
    }

    #[test]
    fn test_display_lists_failed_urls() {
        let report = Report::from_records(&[
            record(1, RecordStatus::Success),
            record(2, RecordStatus::Failed),
        ]);
        let text = report.to_string();
        assert!(text.starts_with("2 files: 1 downloaded, 1 failed"));
        assert!(text.contains("failed: https://cdn.discordapp.com/a/2/f2.png"));
    }

    #[test]
    fn test_serializes_to_json() {
        let report = Report::from_records(&[record(1, RecordStatus::Failed)]);
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["failed_urls"][0], "https://cdn.discordapp.com/a/1/f1.png");
    }
}
