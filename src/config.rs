//! Run configuration and its fail-fast validation.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_WORKERS, MAX_WORKERS, MIN_WORKERS, REQUEST_TIMEOUT_SECS,
};

/// Accepted range for both timeouts, in seconds.
const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=3600;

/// Name of the probe file used to check the output root is writable.
const WRITE_PROBE_NAME: &str = ".cdn-harvester-write-probe";

/// Configuration errors; always fatal and raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The package root does not exist or is not a directory.
    #[error("package directory {path} does not exist or is not a directory")]
    PackageNotFound {
        /// The configured package root.
        path: PathBuf,
    },

    /// The package root exists but cannot be listed.
    #[error("package directory {path} is not readable: {source}")]
    PackageUnreadable {
        /// The configured package root.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The output root cannot be created or written to.
    #[error("output directory {path} is not writable: {source}")]
    OutputNotWritable {
        /// The configured output root.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A numeric setting is outside its accepted range.
    #[error("invalid value for `{field}`: {value}. Expected range: {min}..={max}")]
    OutOfRange {
        /// Setting name.
        field: &'static str,
        /// Provided value.
        value: u64,
        /// Inclusive lower bound.
        min: u64,
        /// Inclusive upper bound.
        max: u64,
    },
}

/// Where the run's ledger lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LedgerBackend {
    /// Scratch ledger that lives only for this process.
    #[default]
    Memory,
    /// Durable `SQLite` ledger at this path; an existing one is resumed.
    Sqlite(PathBuf),
}

/// Settings for one harvest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Directory tree to scan for attachment URLs.
    pub package_root: PathBuf,
    /// Download root; category folders are created below it.
    pub output_root: PathBuf,
    /// Maximum concurrent fetches (1..=100).
    pub max_workers: usize,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Ledger backend.
    pub ledger: LedgerBackend,
    /// Keep a durable ledger file after the report instead of deleting it.
    pub keep_ledger: bool,
}

impl HarvestConfig {
    /// Creates a configuration with default workers, timeouts and an
    /// in-memory ledger.
    #[must_use]
    pub fn new(package_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            package_root: package_root.into(),
            output_root: output_root.into(),
            max_workers: DEFAULT_MAX_WORKERS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            timeout_secs: REQUEST_TIMEOUT_SECS,
            ledger: LedgerBackend::Memory,
            keep_ledger: false,
        }
    }

    /// Checks ranges and paths, creating the output root if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an out-of-range setting, a missing or
    /// unreadable package root, or an output root that cannot be created or
    /// written to.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "max_workers",
            self.max_workers as u64,
            MIN_WORKERS as u64,
            MAX_WORKERS as u64,
        )?;
        check_range(
            "connect_timeout_secs",
            self.connect_timeout_secs,
            *TIMEOUT_RANGE_SECS.start(),
            *TIMEOUT_RANGE_SECS.end(),
        )?;
        check_range(
            "timeout_secs",
            self.timeout_secs,
            *TIMEOUT_RANGE_SECS.start(),
            *TIMEOUT_RANGE_SECS.end(),
        )?;

        validate_package_root(&self.package_root)?;
        validate_output_root(&self.output_root)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn validate_package_root(path: &Path) -> Result<(), ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::PackageNotFound {
            path: path.to_path_buf(),
        });
    }
    fs::read_dir(path).map_err(|source| ConfigError::PackageUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn validate_output_root(path: &Path) -> Result<(), ConfigError> {
    let not_writable = |source| ConfigError::OutputNotWritable {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(path).map_err(not_writable)?;
    let probe = path.join(WRITE_PROBE_NAME);
    fs::write(&probe, b"").map_err(not_writable)?;
    fs::remove_file(&probe).map_err(not_writable)?;
    Ok(())
}
