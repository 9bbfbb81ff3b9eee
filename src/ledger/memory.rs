//! Sharded in-memory ledger backend.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use super::{
    Ledger, LedgerError, NewRecord, RecordId, RecordStatus, Resolution, Result, UrlRecord,
    ensure_terminal_request,
};

/// First id handed out, matching `SQLite` rowid numbering.
const FIRST_RECORD_ID: RecordId = 1;

/// Ledger held entirely in process memory.
///
/// Records live in a [`DashMap`] so status writes from concurrent workers
/// only contend when they hash to the same shard.
#[derive(Debug)]
pub struct MemoryLedger {
    records: DashMap<RecordId, UrlRecord>,
    next_id: AtomicI64,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI64::new(FIRST_RECORD_ID),
        }
    }

    fn require_pending(&self, id: RecordId) -> Result<()> {
        let record = self
            .records
            .get(&id)
            .ok_or(LedgerError::RecordNotFound(id))?;
        if record.status.is_terminal() {
            return Err(LedgerError::AlreadyTerminal {
                id,
                status: record.status,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert_batch(&self, records: &[NewRecord]) -> Result<Vec<RecordId>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.records.insert(
                id,
                UrlRecord {
                    id,
                    url: record.url.clone(),
                    filename: record.filename.clone(),
                    status: RecordStatus::Pending,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    // Validates every target before touching anything so a rejected
    // resolution leaves the ledger unchanged.
    #[instrument(skip(self, resolution), fields(dropped = resolution.dropped.len(), renames = resolution.renames.len()))]
    async fn apply_resolution(&self, resolution: &Resolution) -> Result<()> {
        for id in &resolution.dropped {
            self.require_pending(*id)?;
        }
        for rename in &resolution.renames {
            self.require_pending(rename.id)?;
        }

        for id in &resolution.dropped {
            self.records.remove(id);
        }
        for rename in &resolution.renames {
            if let Some(mut record) = self.records.get_mut(&rename.id) {
                record.filename.clone_from(&rename.filename);
            }
        }
        debug!("resolution applied");
        Ok(())
    }

    async fn update_status(&self, id: RecordId, status: RecordStatus) -> Result<()> {
        ensure_terminal_request(id, status)?;
        let mut record = self
            .records
            .get_mut(&id)
            .ok_or(LedgerError::RecordNotFound(id))?;
        if record.status.is_terminal() {
            return Err(LedgerError::AlreadyTerminal {
                id,
                status: record.status,
            });
        }
        record.status = status;
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<UrlRecord>> {
        let mut records: Vec<UrlRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.records.is_empty())
    }

    async fn discard(&self) -> Result<()> {
        self.records.clear();
        Ok(())
    }
}
