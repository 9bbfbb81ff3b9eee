//! cdn-harvester core library
//!
//! This library extracts attachment URLs from an unpacked data package,
//! assigns every URL a collision-free filename, and downloads them
//! concurrently into folders named after their file extension.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`extract`] - URL pattern matching over a package directory tree
//! - [`resolve`] - Filename derivation and collision resolution
//! - [`ledger`] - Per-record filename and status store (memory or `SQLite`)
//! - [`download`] - HTTP client and bounded-concurrency scheduler
//! - [`pipeline`] - End-to-end orchestration of a run
//! - [`report`] - Final summary derived from the ledger
//! - [`config`] - Run settings and validation
//! - [`db`] - `SQLite` connection and schema management

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod db;
pub mod download;
pub mod extract;
pub mod ledger;
pub mod pipeline;
pub mod report;
pub mod resolve;
mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, HarvestConfig, LedgerBackend};
pub use db::Database;
pub use download::{
    DEFAULT_MAX_WORKERS, DownloadScheduler, DownloadStats, EngineError, FetchError, HttpClient,
    LogProgress, NoProgress, ProgressEvent, ProgressSink,
};
pub use ledger::{Ledger, LedgerError, MemoryLedger, RecordStatus, SqliteLedger, UrlRecord};
pub use pipeline::PipelineError;
pub use report::Report;
