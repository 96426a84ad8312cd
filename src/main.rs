//! CLI entry point for the msu-finder tool.

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use msu_finder::cli::Args;
use msu_finder::{config, Orchestrator, RunOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
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
        .with_writer(std::io::stderr)
        .init();

    // Keep credential-bearing flags out of the logs.
    debug!(
        verbose = args.verbose,
        quiet = args.quiet,
        concurrency = args.concurrency,
        "CLI arguments parsed"
    );

    let config = config::resolve(&args.raw_options())?;
    info!(keyword = %config.keyword, engine = ?config.engine, download = config.download_mode(), "msu-finder starting");

    // Ctrl-C stops new transfers; in-flight links record a cancelled failure.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling remaining downloads");
            signal_token.cancel();
        }
    });

    let orchestrator = Orchestrator::for_config(config, usize::from(args.concurrency), cancel)?;

    match orchestrator.run().await? {
        RunOutcome::Report(links) => {
            for link in &links {
                println!("{link}");
            }
            info!(count = links.len(), "report complete");
        }
        RunOutcome::Downloaded(outcome) => {
            // Per-link failures are reported in the summary, never as a
            // process failure.
            info!(
                completed = outcome.succeeded(),
                failed = outcome.failed(),
                total = outcome.len(),
                "download complete"
            );
        }
    }

    Ok(())
}
