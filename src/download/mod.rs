//! Concurrent attachment downloads into categorized folders.
//!
//! This module fetches every pending ledger record over HTTP and writes it to
//! `<output>/<category>/<filename>`, where the category is the lower-cased
//! file extension.
//!
//! # Features
//!
//! - Streaming downloads into a `.part` file, renamed into place on success
//! - Bounded concurrency (1-100 workers, default 3)
//! - Configurable timeouts (30s connect, 5min request by default)
//! - Structured error types with full context
//! - Serialized, monotonic progress events
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::download::HttpClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! client
//!     .fetch_to_file("https://cdn.discordapp.com/attachments/1/2/cat.png", Path::new("./cat.png"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod progress;

pub use client::{HttpClient, partial_path};
pub use constants::DEFAULT_MAX_WORKERS;
pub use engine::{DownloadScheduler, DownloadStats, EngineError, category_for, destination_for};
pub use error::FetchError;
pub use progress::{LogProgress, NoProgress, ProgressEvent, ProgressSink};
