//! End-to-end harvest: scan, record, resolve, download, report.
//!
//! A run validates its configuration before any network activity, then:
//!
//! 1. Opens the ledger. A durable ledger that already holds records is
//!    resumed and the package is not rescanned.
//! 2. Otherwise scans the package tree on the blocking pool and inserts one
//!    record per extracted URL.
//! 3. Resolves filenames in the ledger.
//! 4. Drains pending records through the [`DownloadScheduler`].
//! 5. Builds the [`Report`] from the ledger and discards the ledger unless
//!    asked to keep it.
//!
//! When a fatal error interrupts a run, the ledger is left in place so a
//! durable one can be resumed.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::{ConfigError, HarvestConfig, LedgerBackend};
use crate::download::{DownloadScheduler, EngineError, HttpClient, ProgressSink};
use crate::extract::scan_tree;
use crate::ledger::{Ledger, LedgerError, MemoryLedger, NewRecord, SqliteLedger};
use crate::report::Report;
use crate::resolve::{derive_filename, resolve_ledger};

/// Fatal errors that stop a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The ledger could not be opened, read or written.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The scheduler stopped on a fatal error.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The package scan task panicked or was cancelled.
    #[error("package scan task failed: {0}")]
    ScanTask(#[from] tokio::task::JoinError),
}

/// Runs a full harvest for `config`, reporting per-record progress to
/// `progress`.
///
/// # Errors
///
/// Returns [`PipelineError`] on invalid configuration or a ledger failure.
/// Failed fetches are not errors; they appear in the returned [`Report`].
#[instrument(skip(config, progress), fields(package = %config.package_root.display(), output = %config.output_root.display()))]
pub async fn run(
    config: &HarvestConfig,
    progress: &dyn ProgressSink,
) -> Result<Report, PipelineError> {
    config.validate()?;

    let client = HttpClient::with_timeouts(config.connect_timeout_secs, config.timeout_secs)
        .map_err(PipelineError::HttpClient)?;
    let scheduler = DownloadScheduler::new(config.max_workers, client)?;

    let ledger = open_ledger(&config.ledger).await?;

    if ledger.is_empty().await? {
        let records = scan_package(&config.package_root).await?;
        info!(count = records.len(), "attachment URLs extracted");
        ledger.insert_batch(&records).await?;
    } else {
        let pending = ledger.pending().await?.len();
        info!(pending, "resuming existing ledger; package scan skipped");
    }

    resolve_ledger(ledger.as_ref()).await?;

    let stats = scheduler
        .run(Arc::clone(&ledger), &config.output_root, progress)
        .await?;
    debug!(
        succeeded = stats.succeeded(),
        failed = stats.failed(),
        "scheduler finished"
    );

    let report = Report::from_records(&ledger.scan_all().await?);

    if config.keep_ledger && matches!(config.ledger, LedgerBackend::Sqlite(_)) {
        info!("keeping ledger file");
    } else {
        ledger.discard().await?;
    }

    Ok(report)
}

/// Opens the configured ledger backend.
///
/// # Errors
///
/// Returns [`LedgerError`] if a `SQLite` ledger cannot be opened or migrated.
pub async fn open_ledger(backend: &LedgerBackend) -> Result<Arc<dyn Ledger>, LedgerError> {
    match backend {
        LedgerBackend::Memory => Ok(Arc::new(MemoryLedger::new())),
        LedgerBackend::Sqlite(path) => {
            debug!(path = %path.display(), "opening durable ledger");
            Ok(Arc::new(SqliteLedger::open(path).await?))
        }
    }
}

/// Scans `root` on the blocking pool and pairs every URL with its derived
/// filename.
async fn scan_package(root: &Path) -> Result<Vec<NewRecord>, tokio::task::JoinError> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        scan_tree(&root)
            .map(|url| {
                let filename = derive_filename(&url);
                NewRecord { url, filename }
            })
            .collect()
    })
    .await
}
