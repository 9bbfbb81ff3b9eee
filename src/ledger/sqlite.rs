//! `SQLite`-backed ledger, durable across process restarts when file-backed.

use std::path::Path;

use async_trait::async_trait;
use sqlx::{FromRow, Row, SqliteConnection};
use tracing::{debug, instrument, warn};

use super::{
    Ledger, LedgerError, NewRecord, RecordId, RecordStatus, Resolution, Result,
    UrlRecord, ensure_terminal_request,
};
use crate::db::{Database, DbError};

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Connection(e) => e.into(),
            DbError::Migration(e) => e.into(),
        }
    }
}

/// Raw ledger row; status is stored as text and parsed on conversion.
#[derive(Debug, FromRow)]
struct LedgerRow {
    id: i64,
    url: String,
    filename: String,
    #[sqlx(rename = "status")]
    status_str: String,
}

impl TryFrom<LedgerRow> for UrlRecord {
    type Error = LedgerError;

    fn try_from(row: LedgerRow) -> Result<Self> {
        let status = row
            .status_str
            .parse()
            .map_err(|_| LedgerError::InvalidStatus(row.status_str.clone()))?;
        Ok(Self {
            id: row.id,
            url: row.url,
            filename: row.filename,
            status,
        })
    }
}

/// Ledger persisted in a `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    db: Database,
}

impl SqliteLedger {
    /// Wraps an already-migrated database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens or creates a file-backed ledger at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the file cannot be opened or migrated.
    pub async fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::new(path).await?))
    }

    /// Creates a ledger that lives only as long as this process.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the database cannot be created.
    pub async fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::new_in_memory().await?))
    }

    /// Returns the backing database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Fetches rows matching an optional status filter, ordered by id.
    async fn fetch(&self, status: Option<RecordStatus>) -> Result<Vec<UrlRecord>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, LedgerRow>(
                    r"SELECT id, url, filename, status FROM ledger
                      WHERE status = ?
                      ORDER BY id ASC",
                )
                .bind(status.as_str())
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, LedgerRow>(
                    r"SELECT id, url, filename, status FROM ledger ORDER BY id ASC",
                )
                .fetch_all(self.db.pool())
                .await?
            }
        };

        rows.into_iter().map(UrlRecord::try_from).collect()
    }
}

/// Reads the current status of `id`, failing if the row is missing.
async fn current_status(conn: &mut SqliteConnection, id: RecordId) -> Result<RecordStatus> {
    let row = sqlx::query(r"SELECT status FROM ledger WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(LedgerError::RecordNotFound(id))?;
    let status: String = row.get("status");
    status
        .parse()
        .map_err(|_| LedgerError::InvalidStatus(status.clone()))
}

async fn require_pending(conn: &mut SqliteConnection, id: RecordId) -> Result<()> {
    let status = current_status(conn, id).await?;
    if status.is_terminal() {
        return Err(LedgerError::AlreadyTerminal { id, status });
    }
    Ok(())
}

/// Removes a file, treating "not found" as success.
fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LedgerError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert_batch(&self, records: &[NewRecord]) -> Result<Vec<RecordId>> {
        let mut tx = self.db.pool().begin().await?;
        let mut ids = Vec::with_capacity(records.len());

        for record in records {
            let row = sqlx::query(
                r"INSERT INTO ledger (url, filename, status)
                  VALUES (?, ?, ?)
                  RETURNING id",
            )
            .bind(&record.url)
            .bind(&record.filename)
            .bind(RecordStatus::Pending.as_str())
            .fetch_one(&mut *tx)
            .await?;
            ids.push(row.get::<i64, _>("id"));
        }

        tx.commit().await?;
        debug!(inserted = ids.len(), "records inserted");
        Ok(ids)
    }

    #[instrument(skip(self, resolution), fields(dropped = resolution.dropped.len(), renames = resolution.renames.len()))]
    async fn apply_resolution(&self, resolution: &Resolution) -> Result<()> {
        if resolution.is_empty() {
            return Ok(());
        }

        // Dropping the transaction on an early return rolls everything back.
        let mut tx = self.db.pool().begin().await?;

        for id in &resolution.dropped {
            require_pending(&mut *tx, *id).await?;
            sqlx::query(r"DELETE FROM ledger WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        for rename in &resolution.renames {
            require_pending(&mut *tx, rename.id).await?;
            sqlx::query(
                r"UPDATE ledger
                  SET filename = ?, updated_at = datetime('now')
                  WHERE id = ?",
            )
            .bind(&rename.filename)
            .bind(rename.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("resolution applied");
        Ok(())
    }

    async fn update_status(&self, id: RecordId, status: RecordStatus) -> Result<()> {
        ensure_terminal_request(id, status)?;

        let result = sqlx::query(
            r"UPDATE ledger
              SET status = ?, updated_at = datetime('now')
              WHERE id = ? AND status = ?",
        )
        .bind(status.as_str())
        .bind(id)
        .bind(RecordStatus::Pending.as_str())
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let mut conn = self.db.pool().acquire().await?;
        let current = current_status(&mut *conn, id).await?;
        Err(LedgerError::AlreadyTerminal {
            id,
            status: current,
        })
    }

    async fn scan_all(&self) -> Result<Vec<UrlRecord>> {
        self.fetch(None).await
    }

    async fn pending(&self) -> Result<Vec<UrlRecord>> {
        self.fetch(Some(RecordStatus::Pending)).await
    }

    async fn is_empty(&self) -> Result<bool> {
        let row = sqlx::query(r"SELECT COUNT(*) AS count FROM ledger")
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.get::<i64, _>("count") == 0)
    }

    #[instrument(skip(self))]
    async fn discard(&self) -> Result<()> {
        let Some(path) = self.db.path() else {
            sqlx::query(r"DELETE FROM ledger")
                .execute(self.db.pool())
                .await?;
            return Ok(());
        };

        self.db.close().await;
        remove_if_exists(path)?;
        for suffix in ["-wal", "-shm"] {
            let mut sibling = path.as_os_str().to_owned();
            sibling.push(suffix);
            if let Err(e) = remove_if_exists(Path::new(&sibling)) {
                warn!(error = %e, "failed to remove ledger sidecar file");
            }
        }
        debug!(path = %path.display(), "ledger file removed");
        Ok(())
    }
}
