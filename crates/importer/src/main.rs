//! Importer - bitmap index ingestion tool

use anyhow::Result;
use clap::Parser;
use importer::cli::{Cli, Commands};
use importer::config::{ConsumerConfig, PoolConfig};
use importer::runner::RunOutcome;
use importer::{consumer, generate, import, progress};
use importer_common::logging::{init_logging, LogConfig, LogLevel};
use indicatif::ProgressBar;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("importer")
        .build();
    // environment variables take precedence
    let _log_guard = init_logging(&LogConfig::from_env_or(log_config)?)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping workers");
            on_signal.cancel();
        }
    });

    let start = Instant::now();

    match cli.command {
        Commands::Consumer(args) => {
            let config = args.merge(ConsumerConfig::from_env()?);
            let progress = if cli.no_progress {
                ProgressBar::hidden()
            } else {
                progress::create_progress_bar(consumer::expected_writes(&config), "Importing events")
            };
            let outcome = consumer::run(&config, progress, cancel).await?;
            report(&outcome).await;
        },
        Commands::Import(args) => {
            let config = args.into_config(PoolConfig::from_env()?);
            let progress = if cli.no_progress {
                ProgressBar::hidden()
            } else {
                progress::create_spinner("Importing records")
            };
            let outcome = import::run(&config, progress, cancel).await?;
            report(&outcome).await;
        },
        Commands::Generate(args) => {
            let mut config = ConsumerConfig::from_env()?;
            args.frames.apply(&mut config);
            let written = generate::run(&config, &args.output).await?;
            println!("Wrote {} records to {}", written, args.output.display());
        },
    }

    info!(elapsed = ?start.elapsed(), "Done");
    Ok(())
}

async fn report(outcome: &RunOutcome) {
    let summary = &outcome.summary;
    let index = outcome.indexer.snapshot().await;

    println!(
        "Imported {} records ({} bits, {} values) into index '{}' with {} workers",
        summary.records,
        summary.bits,
        summary.values,
        outcome.indexer.index(),
        summary.workers
    );
    println!(
        "Index holds {} bits and {} values, {} status updates observed",
        index.bit_count(),
        index.value_count(),
        outcome.status_updates
    );

    if summary.failed_workers > 0 {
        warn!(
            failed_workers = summary.failed_workers,
            "Some workers stopped on errors, see log for details"
        );
    }
    if summary.cancelled_workers > 0 {
        warn!(cancelled_workers = summary.cancelled_workers, "Run was cancelled before completion");
    }
}
