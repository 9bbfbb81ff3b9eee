//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use harvester_core::{DEFAULT_MAX_WORKERS, HarvestConfig, LedgerBackend};

/// Download every attachment linked from an unpacked data package.
///
/// Scans the package for cdn.discordapp.com links, gives every file a unique
/// name, and downloads them into folders named after their extension.
#[derive(Parser, Debug)]
#[command(name = "cdn-harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Directory of the unpacked data package to scan
    #[arg(short, long, value_name = "DIR")]
    pub package: PathBuf,

    /// Directory to download into (created if missing)
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'w', long, alias = "max_workers", default_value_t = DEFAULT_MAX_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub max_workers: u8,

    /// Durable ledger file; an existing ledger is resumed instead of rescanning
    #[arg(long, value_name = "FILE")]
    pub ledger: Option<PathBuf>,

    /// Keep the ledger file after the run instead of deleting it
    #[arg(long, requires = "ledger")]
    pub keep_ledger: bool,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: u64,

    /// Whole-request timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Maps parsed arguments onto the library configuration.
    #[must_use]
    pub fn to_config(&self) -> HarvestConfig {
        HarvestConfig {
            package_root: self.package.clone(),
            output_root: self.output.clone(),
            max_workers: usize::from(self.max_workers),
            connect_timeout_secs: self.connect_timeout,
            timeout_secs: self.timeout,
            ledger: self
                .ledger
                .clone()
                .map_or(LedgerBackend::Memory, LedgerBackend::Sqlite),
            keep_ledger: self.keep_ledger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 5] = ["cdn-harvester", "--package", "pkg", "--output", "out"];

    fn parse_with(extra: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(REQUIRED.iter().chain(extra).copied())
    }

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = parse_with(&[]).unwrap();
        assert_eq!(args.package, PathBuf::from("pkg"));
        assert_eq!(args.output, PathBuf::from("out"));
        assert_eq!(args.max_workers, 3);
        assert_eq!(args.connect_timeout, 30);
        assert_eq!(args.timeout, 300);
        assert!(args.ledger.is_none());
        assert!(!args.keep_ledger);
        assert!(!args.json);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_missing_package_is_error() {
        let result = Args::try_parse_from(["cdn-harvester", "--output", "out"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_missing_output_is_error() {
        let result = Args::try_parse_from(["cdn-harvester", "--package", "pkg"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_short_path_flags() {
        let args = Args::try_parse_from(["cdn-harvester", "-p", "a", "-o", "b"]).unwrap();
        assert_eq!(args.package, PathBuf::from("a"));
        assert_eq!(args.output, PathBuf::from("b"));
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        assert_eq!(parse_with(&["-v"]).unwrap().verbose, 1);
        assert_eq!(parse_with(&["-vv"]).unwrap().verbose, 2);
        assert_eq!(parse_with(&["--verbose", "--verbose"]).unwrap().verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        assert!(parse_with(&["-q"]).unwrap().quiet);
        assert!(parse_with(&["--quiet"]).unwrap().quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["cdn-harvester", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["cdn-harvester", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = parse_with(&["--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    // ==================== Max Workers Tests ====================

    #[test]
    fn test_cli_max_workers_flags() {
        assert_eq!(parse_with(&["-w", "5"]).unwrap().max_workers, 5);
        assert_eq!(parse_with(&["--max-workers", "20"]).unwrap().max_workers, 20);
    }

    #[test]
    fn test_cli_max_workers_underscore_alias() {
        assert_eq!(parse_with(&["--max_workers", "7"]).unwrap().max_workers, 7);
    }

    #[test]
    fn test_cli_max_workers_bounds() {
        assert_eq!(parse_with(&["-w", "1"]).unwrap().max_workers, 1);
        assert_eq!(parse_with(&["-w", "100"]).unwrap().max_workers, 100);
    }

    #[test]
    fn test_cli_max_workers_out_of_range_rejected() {
        for value in ["0", "101"] {
            let err = parse_with(&["-w", value]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    // ==================== Timeout Tests ====================

    #[test]
    fn test_cli_timeouts_long_flags() {
        let args = parse_with(&["--connect-timeout", "5", "--timeout", "60"]).unwrap();
        assert_eq!(args.connect_timeout, 5);
        assert_eq!(args.timeout, 60);
    }

    #[test]
    fn test_cli_timeout_zero_rejected() {
        let err = parse_with(&["--timeout", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    // ==================== Ledger Tests ====================

    #[test]
    fn test_cli_ledger_flag_maps_to_sqlite_backend() {
        let args = parse_with(&["--ledger", "run.db", "--keep-ledger"]).unwrap();
        let config = args.to_config();
        assert_eq!(config.ledger, LedgerBackend::Sqlite(PathBuf::from("run.db")));
        assert!(config.keep_ledger);
    }

    #[test]
    fn test_cli_keep_ledger_requires_ledger() {
        let err = parse_with(&["--keep-ledger"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_to_config_defaults_to_memory_ledger() {
        let config = parse_with(&["-w", "8"]).unwrap().to_config();
        assert_eq!(config.ledger, LedgerBackend::Memory);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.package_root, PathBuf::from("pkg"));
    }
}
