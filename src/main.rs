//! CLI entry point for cdn-harvester.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use harvester_core::{LogProgress, ProgressEvent, ProgressSink, pipeline};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

mod cli;

use cli::Args;

/// Exit code when the run completed but some records failed.
const EXIT_PARTIAL_FAILURE: u8 = 2;

/// Progress bar sink used when stderr is an interactive terminal.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_item(&self, event: &ProgressEvent) {
        self.bar.set_position(event.completed as u64);
        if event.success {
            self.bar.set_message(event.filename.clone());
        } else {
            self.bar.println(format!("failed: {}", event.url));
        }
    }

    fn on_finish(&self, _succeeded: usize, _failed: usize) {
        self.bar.finish_and_clear();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");
    info!("cdn-harvester starting");

    let config = args.to_config();
    let report = if !args.quiet && io::stderr().is_terminal() {
        pipeline::run(&config, &BarProgress::new()).await?
    } else {
        pipeline::run(&config, &LogProgress).await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.quiet {
        println!("{report}");
    }

    info!(
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        "run complete"
    );

    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PARTIAL_FAILURE))
    }
}
