//! Constants for the download module (timeouts, worker bounds).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default whole-request timeout (5 minutes for large attachments).
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 100;

/// Default worker count.
pub const DEFAULT_MAX_WORKERS: usize = 3;

/// Suffix of the scratch file a body is streamed into before the final rename.
pub const PARTIAL_SUFFIX: &str = ".part";
