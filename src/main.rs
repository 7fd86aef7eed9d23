//! # Poll Watch
//!
//! Scrapes the opinion-poll overview table on wahlrecht.de, keeps a
//! historical record of every poll per institute and publication date, and
//! reports which polls are new or changed since the last run.
//!
//! ## Usage
//!
//! ```sh
//! poll_watch -s ./poll_state.json -j ./reports
//! ```
//!
//! ## Architecture
//!
//! Each run is a short pipeline:
//! 1. **Loading**: Read prior poll state from the JSON state file
//! 2. **Fetching**: Download the poll overview page
//! 3. **Extraction**: Turn the table into keyed poll records merged into the state
//! 4. **Reconciliation**: Compare against stored state, persist, report changes
//!
//! Scheduling is left to the caller (cron, systemd timer, ...).

use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

use poll_watch::cli::Cli;
use poll_watch::config::{load_config, ScrapeConfig};
use poll_watch::fetch::HttpFetcher;
use poll_watch::outputs::json::{write_report, ChangeReport};
use poll_watch::pipeline;
use poll_watch::store::JsonFileStore;
use poll_watch::utils::ensure_writable_dir;

/// Log to stderr, filtered by `RUST_LOG` (default `info`), with UTC timestamps.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let start_time = std::time::Instant::now();
    info!("poll_watch starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = match &args.config {
        Some(path) => load_config(path).await?,
        None => ScrapeConfig::default(),
    };
    let config = args.apply(config);
    info!(
        url = %config.page_url,
        mode = %config.mode,
        state_file = %args.state_file,
        "Configuration ready"
    );

    // Early check: fail before scraping if the report can't be written
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e);
        }
    }

    let fetcher = HttpFetcher::new(&config.user_agent)?;
    let store = JsonFileStore::new(&args.state_file);

    let outcome = match pipeline::run(&fetcher, &store, &config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Scrape run failed");
            return Err(e);
        }
    };

    for record in &outcome.changed {
        let results = record
            .results
            .iter()
            .map(|(party, value)| format!("{party}={value}"))
            .join(" ");
        info!(
            institute = %record.institute_name,
            published = %record.published_date,
            %results,
            "New or updated poll"
        );
    }

    if let Some(dir) = &args.json_output_dir {
        if outcome.changed.is_empty() {
            info!("No changes; skipping change report");
        } else {
            let report = ChangeReport::now(config.mode, outcome.changed.clone());
            write_report(&report, dir).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        changed = outcome.changed.len(),
        stored = outcome.stored,
        persisted = outcome.persisted,
        "Execution complete"
    );

    Ok(())
}
