//! One scrape run: fetch the page, extract polls, reconcile with stored state.
//!
//! The run owns its in-memory state snapshot. Fetch and write failures abort
//! the run before anything is persisted; malformed table cells never do.

use crate::config::ScrapeConfig;
use crate::fetch::Fetch;
use crate::models::PollRecord;
use crate::reconcile::{reconcile, Reconciliation};
use crate::scrapers::wahlrecht::{extract_polls, parse_poll_table};
use crate::store::StateStore;
use std::error::Error;
use tracing::{info, instrument};

/// Run a full scrape and return the reconciliation outcome.
#[instrument(level = "info", skip_all, fields(url = %config.page_url, mode = %config.mode))]
pub async fn run<F: Fetch, S: StateStore>(
    fetcher: &F,
    store: &S,
    config: &ScrapeConfig,
) -> Result<Reconciliation, Box<dyn Error>> {
    let mut state = store.load().await.into_state();
    info!(records = state.len(), "Loaded poll state");

    let html = fetcher.fetch(&config.page_url).await?;
    let table = parse_poll_table(&html, &config.table_selector)?;
    let touched = extract_polls(&table, config, &mut state)?;

    reconcile(store, &state, &touched, config.mode).await
}

/// Run a full scrape and return the new or changed poll records.
pub async fn scrape_polls<F: Fetch, S: StateStore>(
    fetcher: &F,
    store: &S,
    config: &ScrapeConfig,
) -> Result<Vec<PollRecord>, Box<dyn Error>> {
    Ok(run(fetcher, store, config).await?.changed)
}
