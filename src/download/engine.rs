//! Bounded-concurrency scheduler that drains the ledger's pending records.
//!
//! # Overview
//!
//! [`DownloadScheduler::run`] takes every `Pending` record from a [`Ledger`],
//! spawns one task per record, and lets a semaphore bound how many fetches are
//! in flight. Each task writes its record's terminal status back to the ledger
//! and reports the outcome over a channel; a single reporting loop turns those
//! outcomes into numbered [`ProgressEvent`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use harvester_core::download::{DownloadScheduler, HttpClient, LogProgress};
//! use harvester_core::ledger::{Ledger, MemoryLedger};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new());
//! let scheduler = DownloadScheduler::new(3, HttpClient::new())?;
//! let stats = scheduler.run(ledger, Path::new("./downloads"), &LogProgress).await?;
//! println!("ok: {}, failed: {}", stats.succeeded(), stats.failed());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, instrument, warn};

use super::constants::{MAX_WORKERS, MIN_WORKERS};
use super::progress::{ProgressEvent, ProgressSink};
use super::{FetchError, HttpClient};
use crate::ledger::{Ledger, LedgerError, RecordId, RecordStatus, UrlRecord};

/// Error type for scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Ledger read or status write failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Outcome counts from one scheduler run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadStats {
    succeeded: usize,
    failed: usize,
}

impl DownloadStats {
    /// Returns the number of records that ended as `Success`.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Returns the number of records that ended as `Failed`.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Returns the number of records processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    fn record(&mut self, success: bool) {
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Message a worker sends to the reporting loop once its record is settled.
#[derive(Debug)]
struct Outcome {
    id: RecordId,
    url: String,
    filename: String,
    success: bool,
}

/// Concurrent fetch scheduler.
///
/// # Concurrency Model
///
/// - Every pending record is spawned up front as its own Tokio task
/// - A task holds a semaphore permit for the duration of its fetch
/// - Permits are released automatically when the task finishes (RAII)
/// - Progress is serialized through one channel receiver
#[derive(Debug)]
pub struct DownloadScheduler {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
    client: HttpClient,
}

impl DownloadScheduler {
    /// Creates a scheduler allowing at most `max_workers` concurrent fetches.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use harvester_core::download::{DownloadScheduler, HttpClient};
    ///
    /// let scheduler = DownloadScheduler::new(3, HttpClient::new()).unwrap();
    /// assert_eq!(scheduler.max_workers(), 3);
    /// ```
    #[instrument(level = "debug", skip(client))]
    pub fn new(max_workers: usize, client: HttpClient) -> Result<Self, EngineError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&max_workers) {
            return Err(EngineError::InvalidConcurrency { value: max_workers });
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            client,
        })
    }

    /// Returns the configured worker limit.
    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Fetches every pending record into `output_root/<category>/<filename>`.
    ///
    /// Individual fetch failures do NOT cause this method to error; they are
    /// recorded as `Failed` and counted in the stats.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Ledger`] if pending records cannot be read or a
    /// status write fails. The remaining records still run to completion
    /// before the first such error is returned.
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    #[instrument(skip(self, ledger, progress), fields(output_root = %output_root.display(), max_workers = self.max_workers))]
    pub async fn run(
        &self,
        ledger: Arc<dyn Ledger>,
        output_root: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<DownloadStats, EngineError> {
        let pending = ledger.pending().await?;
        let total = pending.len();
        info!(total, "starting downloads");
        progress.on_start(total);

        let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();
        let mut handles = Vec::with_capacity(total);

        for record in pending {
            let semaphore = Arc::clone(&self.semaphore);
            let client = self.client.clone();
            let ledger = Arc::clone(&ledger);
            let tx = tx.clone();
            let output_root = output_root.to_path_buf();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| EngineError::SemaphoreClosed)?;

                let success = match fetch_record(&client, &record, &output_root).await {
                    Ok(bytes) => {
                        debug!(id = record.id, bytes, "record fetched");
                        true
                    }
                    Err(e) => {
                        warn!(
                            id = record.id,
                            url = %record.url,
                            kind = e.kind(),
                            error = %e,
                            "fetch failed"
                        );
                        false
                    }
                };

                let status = if success {
                    RecordStatus::Success
                } else {
                    RecordStatus::Failed
                };
                let written = ledger.update_status(record.id, status).await;

                // The receiver outlives every sender, so send cannot fail.
                let _ = tx.send(Outcome {
                    id: record.id,
                    url: record.url,
                    filename: record.filename,
                    success,
                });

                written.map_err(EngineError::from)
            }));
        }
        drop(tx);

        let mut stats = DownloadStats::default();
        while let Some(outcome) = rx.recv().await {
            stats.record(outcome.success);
            debug!(id = outcome.id, completed = stats.total(), "record settled");
            progress.on_item(&ProgressEvent {
                completed: stats.total(),
                total,
                filename: outcome.filename,
                url: outcome.url,
                success: outcome.success,
            });
        }

        let mut first_error = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "worker failed");
                    first_error.get_or_insert(e);
                }
                Err(e) => warn!(error = %e, "download task panicked"),
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            succeeded = stats.succeeded(),
            failed = stats.failed(),
            total,
            "downloads complete"
        );
        progress.on_finish(stats.succeeded(), stats.failed());
        Ok(stats)
    }
}

/// Creates the category directory and fetches one record into it.
async fn fetch_record(
    client: &HttpClient,
    record: &UrlRecord,
    output_root: &Path,
) -> Result<u64, FetchError> {
    let dest = destination_for(output_root, &record.filename);
    if let Some(dir) = dest.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| FetchError::io(dir, e))?;
    }
    client.fetch_to_file(&record.url, &dest).await
}

/// Returns the category of `filename`: its extension, lower-cased, without
/// the dot. Leading dots never start an extension, so `.bashrc` has none.
///
/// # Examples
///
/// ```
/// use harvester_core::download::category_for;
///
/// assert_eq!(category_for("Photo.JPG"), "jpg");
/// assert_eq!(category_for("archive.tar.gz"), "gz");
/// assert_eq!(category_for("README"), "");
/// ```
#[must_use]
pub fn category_for(filename: &str) -> String {
    let stem_and_ext = filename.trim_start_matches('.');
    stem_and_ext
        .rfind('.')
        .map(|dot| stem_and_ext[dot + 1..].to_lowercase())
        .unwrap_or_default()
}

/// Returns the final path of `filename` under `output_root`. Files with no
/// category land directly in `output_root`.
#[must_use]
pub fn destination_for(output_root: &Path, filename: &str) -> PathBuf {
    let category = category_for(filename);
    if category.is_empty() {
        output_root.join(filename)
    } else {
        output_root.join(category).join(filename)
    }
}
