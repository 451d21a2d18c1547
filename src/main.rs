//! # Vagas Scraper
//!
//! Collects job postings from job-board APIs, deduplicates them and stores
//! them per category, optionally publishing each category to a Firebase
//! Realtime Database.
//!
//! ## Usage
//!
//! ```sh
//! vagas_scraper --config-dir ./config --output-dir ./data
//! ```
//!
//! ## Architecture
//!
//! Each category runs in isolation:
//! 1. **Configuration**: read `queries_<category>.json`
//! 2. **Searching**: every platform × keyword × work mode, one request at a time
//! 3. **Deduplication**: postings are keyed by canonical URL for the whole run
//! 4. **Output**: atomic write of `db_<category>.json`, then remote sync
//!
//! Requests are spaced by a random delay and retried with exponential backoff.
//! Ctrl-C cancels the run cleanly, even in the middle of a backoff.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dedup;
mod error;
mod models;
mod orchestrator;
mod outputs;
mod runner;
mod scrapers;
mod sync;
mod transport;
mod utils;

use cli::Cli;
use runner::{Runner, StepOutcome};
use scrapers::AdapterRegistry;
use scrapers::gupy::GupyAdapter;
use sync::{FirebaseSink, SyncSink};
use transport::build_transport;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // .env must be loaded before clap reads env fallbacks.
    let _ = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    info!(
        config_dir = %args.config_dir.display(),
        output_dir = %args.output_dir.display(),
        "Starting job search run"
    );

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; cancelling run");
                cancel.cancel();
            }
        });
    }

    let transport = build_transport(args.retry_policy(), cancel.clone())?;
    let registry = AdapterRegistry::new().register("gupy", Arc::new(GupyAdapter::new(transport)));
    info!(platforms = ?registry.platforms(), "Adapters registered");

    let sink: Option<Arc<dyn SyncSink>> = match args.sync_target() {
        Some(url) => {
            let sink = FirebaseSink::new(url, args.firebase_auth_token.clone())?;
            info!("Firebase sync enabled");
            Some(Arc::new(sink))
        }
        None => {
            info!("Firebase sync disabled");
            None
        }
    };

    let categories = config::categories(&args.categories, &args.config_dir, &args.output_dir);
    let runner = Runner::new(registry, sink, cancel);
    let summary = runner.run_all(&categories).await;

    for report in &summary.reports {
        info!(
            category = %report.category,
            combinations = report.combinations_attempted,
            unique = report.unique_postings,
            duplicates = report.duplicates_discarded,
            failed_searches = report.failed_combinations,
            persisted = ?report.persistence,
            synced = ?report.sync,
            duration_secs = (report.finished_at - report.started_at).num_seconds(),
            "Category finished"
        );
        if let StepOutcome::Failed(reason) = &report.persistence {
            error!(
                category = %report.category,
                %reason,
                "New postings were NOT saved; previous file intact, next run must retry"
            );
        }
    }
    for (category, reason) in &summary.skipped {
        warn!(%category, %reason, "Category skipped");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        categories = summary.reports.len(),
        skipped = summary.skipped.len(),
        cancelled = summary.cancelled,
        "Execution complete"
    );

    Ok(if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
