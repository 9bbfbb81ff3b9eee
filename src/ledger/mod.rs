//! Progress ledger: per-record filename and status tracking for a run.
//!
//! The ledger is the only shared mutable state in a run. The extractor fills
//! it, the filename resolver rewrites it, the download scheduler drains it and
//! writes outcomes back, and the final report is read from it.
//!
//! Two backends implement [`Ledger`]:
//! - [`MemoryLedger`] - sharded in-memory map, scratch state for one process
//! - [`SqliteLedger`] - `SQLite` store, in-memory or file-backed so a crashed
//!   run can resume its pending records
//!
//! # Example
//!
//! ```
//! use harvester_core::ledger::{Ledger, MemoryLedger, NewRecord, RecordStatus};
//!
//! # async fn example() -> Result<(), harvester_core::ledger::LedgerError> {
//! let ledger = MemoryLedger::new();
//! let ids = ledger
//!     .insert_batch(&[NewRecord::new("https://cdn.discordapp.com/a/1/x.png", "x.png")])
//!     .await?;
//! ledger.update_status(ids[0], RecordStatus::Success).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod record;
mod sqlite;

pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use record::{NewRecord, RecordId, RecordStatus, Rename, Resolution, UrlRecord};
pub use sqlite::SqliteLedger;

use async_trait::async_trait;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Injectable store of [`UrlRecord`]s for a single run.
///
/// Implementations must accept concurrent [`update_status`](Ledger::update_status)
/// calls for distinct records without losing any of them.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Inserts records in order, all as `Pending`, returning their ids.
    async fn insert_batch(&self, records: &[NewRecord]) -> Result<Vec<RecordId>>;

    /// Applies drops and renames from the filename resolver as one unit.
    ///
    /// Only `Pending` records may be renamed.
    async fn apply_resolution(&self, resolution: &Resolution) -> Result<()>;

    /// Moves a `Pending` record to `Success` or `Failed`.
    async fn update_status(&self, id: RecordId, status: RecordStatus) -> Result<()>;

    /// Returns every record ordered by id.
    async fn scan_all(&self) -> Result<Vec<UrlRecord>>;

    /// Returns the `Pending` records ordered by id.
    async fn pending(&self) -> Result<Vec<UrlRecord>> {
        Ok(self
            .scan_all()
            .await?
            .into_iter()
            .filter(|record| record.status == RecordStatus::Pending)
            .collect())
    }

    /// Returns true when the ledger holds no records.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.scan_all().await?.is_empty())
    }

    /// Drops all ledger state once the run's report has been produced.
    async fn discard(&self) -> Result<()>;
}

/// Rejects status writes that are not a terminal transition.
fn ensure_terminal_request(id: RecordId, status: RecordStatus) -> Result<()> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(LedgerError::InvalidTransition {
            id,
            requested: status,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_terminal_request() {
        assert!(ensure_terminal_request(1, RecordStatus::Success).is_ok());
        assert!(ensure_terminal_request(1, RecordStatus::Failed).is_ok());
        assert!(matches!(
            ensure_terminal_request(1, RecordStatus::Pending),
            Err(LedgerError::InvalidTransition { id: 1, .. })
        ));
    }

    /// Runs the shared contract against any backend.
    async fn exercise_contract(ledger: &dyn Ledger) {
        assert!(ledger.is_empty().await.unwrap());

        let ids = ledger
            .insert_batch(&[
                NewRecord::new("https://cdn.discordapp.com/a/1/x.png", "x.png"),
                NewRecord::new("https://cdn.discordapp.com/a/2/x.png", "x.png"),
                NewRecord::new("https://cdn.discordapp.com/a/3/y.png,", "y.png,"),
            ])
            .await
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids[0] < ids[1] && ids[1] < ids[2]);

        ledger
            .apply_resolution(&Resolution {
                dropped: vec![ids[2]],
                renames: vec![Rename {
                    id: ids[0],
                    filename: "0001_x.png".to_string(),
                }],
            })
            .await
            .unwrap();

        let records = ledger.scan_all().await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["0001_x.png", "x.png"]);

        ledger
            .update_status(ids[0], RecordStatus::Success)
            .await
            .unwrap();
        let second = ledger.update_status(ids[0], RecordStatus::Failed).await;
        assert!(matches!(
            second,
            Err(LedgerError::AlreadyTerminal {
                status: RecordStatus::Success,
                ..
            })
        ));

        let rename_terminal = ledger
            .apply_resolution(&Resolution {
                dropped: Vec::new(),
                renames: vec![Rename {
                    id: ids[0],
                    filename: "other.png".to_string(),
                }],
            })
            .await;
        assert!(matches!(
            rename_terminal,
            Err(LedgerError::AlreadyTerminal { .. })
        ));

        let missing = ledger.update_status(999, RecordStatus::Failed).await;
        assert!(matches!(missing, Err(LedgerError::RecordNotFound(999))));

        let pending = ledger.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, ids[1]);

        ledger.discard().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_ledger_contract() {
        let ledger = MemoryLedger::new();
        exercise_contract(&ledger).await;
        assert!(ledger.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_ledger_contract() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        exercise_contract(&ledger).await;
    }
}
