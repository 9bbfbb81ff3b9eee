//! Progress notification for the download scheduler.
//!
//! Workers never call a sink directly. Outcomes travel over a channel to one
//! reporting loop, which numbers them and forwards one [`ProgressEvent`] per
//! record, so sinks see strictly increasing `completed` values.

use tracing::info;

/// One finished record, as seen by the reporting loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Records finished so far, including this one. Starts at 1.
    pub completed: usize,
    /// Records submitted in this run.
    pub total: usize,
    /// Final filename of the record.
    pub filename: String,
    /// Source URL of the record.
    pub url: String,
    /// Whether the record ended as `Success`.
    pub success: bool,
}

/// Receives scheduler progress.
///
/// All methods have no-op defaults. Calls are made from a single task in
/// order, never concurrently.
pub trait ProgressSink: Send + Sync {
    /// Called once before any record is dispatched.
    fn on_start(&self, _total: usize) {}

    /// Called once per finished record, in completion order.
    fn on_item(&self, _event: &ProgressEvent) {}

    /// Called once after the last record finished.
    fn on_finish(&self, _succeeded: usize, _failed: usize) {}
}

/// Sink that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Sink that writes one `info` line per finished record.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_item(&self, event: &ProgressEvent) {
        info!(
            url = %event.url,
            "downloaded {} of {} files: {} (success: {})",
            event.completed,
            event.total,
            event.filename,
            event.success
        );
    }
}
