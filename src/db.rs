//! Database connection and schema management for the durable ledger.
//!
//! This module provides SQLite connectivity with:
//! - Connection pool management
//! - WAL mode for concurrent reads on file-backed databases
//! - Automatic migration execution
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("ledger.db")).await?;
//! // Use db for queries...
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::instrument;

/// Default maximum number of connections in the pool.
/// Kept low for SQLite since it uses file-level locking.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in milliseconds.
/// Connections will wait this long before returning SQLITE_BUSY.
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connection(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Database connection wrapper with connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl Database {
    /// Opens (creating if needed) a database file at `db_path`.
    ///
    /// Enables WAL mode and a busy timeout, then runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails,
    /// or `DbError::Migration` if migrations fail.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(&db_url)
            .await?;

        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        sqlx::query(&format!("PRAGMA busy_timeout={BUSY_TIMEOUT_MS}"))
            .execute(&pool)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            path: Some(db_path.to_path_buf()),
        })
    }

    /// Creates an in-memory database.
    ///
    /// A single connection is used: every pooled connection to
    /// `sqlite::memory:` would otherwise see its own empty database.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails,
    /// or `DbError::Migration` if migrations fail.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool, path: None })
    }

    /// Returns a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the database file path, or `None` for in-memory databases.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[cfg(test)]
    async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0.to_lowercase() == "wal")
    }

    /// Gracefully closes all connections in the pool.
    #[instrument(skip(self))]
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_new_in_memory_succeeds() {
        let db = Database::new_in_memory().await;
        assert!(db.is_ok(), "Failed to create in-memory database");
        assert!(db.unwrap().path().is_none());
    }

    #[tokio::test]
    async fn test_database_ledger_table_exists_after_migration() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO ledger (url, filename) VALUES ('https://cdn.discordapp.com/a/1/x.png', 'x.png')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_ok(), "Ledger table should exist after migration");
    }

    #[tokio::test]
    async fn test_database_rejects_invalid_status() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO ledger (url, filename, status) VALUES ('u', 'x.png', 'completed')",
        )
        .execute(db.pool())
        .await;

        assert!(
            result.is_err(),
            "Unknown status should be rejected by CHECK constraint"
        );
    }

    #[tokio::test]
    async fn test_database_accepts_empty_filename() {
        let db = Database::new_in_memory().await.unwrap();

        // Malformed captures are stored as scanned and dropped during resolution.
        let result = sqlx::query(
            "INSERT INTO ledger (url, filename) VALUES ('https://cdn.discordapp.com/attachments/1/3/', '')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_ok(), "Empty filename should be stored");
    }

    #[tokio::test]
    async fn test_database_with_tempfile() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("ledger.db");

        let db = Database::new(&db_path).await.unwrap();
        assert_eq!(db.path(), Some(db_path.as_path()));
        assert!(db.is_wal_enabled().await.unwrap());
        db.close().await;
    }
}
