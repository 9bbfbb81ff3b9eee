//! Error types for ledger operations.

use std::path::PathBuf;

use thiserror::Error;

use super::record::{RecordId, RecordStatus};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database operation failed.
    #[error("ledger database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration could not be applied.
    #[error("ledger migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A ledger file could not be removed.
    #[error("failed to remove ledger file {path}: {source}")]
    Io {
        /// The file that could not be removed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No record exists with the given id.
    #[error("ledger record not found: id {0}")]
    RecordNotFound(RecordId),

    /// The record already reached a terminal state and cannot change again.
    #[error("ledger record {id} is already {status}; terminal records are immutable")]
    AlreadyTerminal {
        /// The record that was targeted.
        id: RecordId,
        /// Its current terminal status.
        status: RecordStatus,
    },

    /// A status write that is not `Pending → Success|Failed`.
    #[error("invalid status transition for record {id}: cannot set {requested}")]
    InvalidTransition {
        /// The record that was targeted.
        id: RecordId,
        /// The status that was requested.
        requested: RecordStatus,
    },

    /// A stored status string could not be parsed.
    #[error("invalid status '{0}' stored in ledger")]
    InvalidStatus(String),
}
