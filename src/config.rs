//! Scrape configuration.
//!
//! Defaults target the federal poll overview on wahlrecht.de. A YAML file can
//! override any field; command-line flags are applied on top in `main`.
//!
//! ```yaml
//! page_url: https://www.wahlrecht.de/umfragen/
//! mode: latest
//! party_rows:
//!   - { code: cdu, label: CDU }
//!   - { code: spd, label: SPD }
//! ```

use crate::models::PartyRow;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::path::Path;
use tracing::{info, instrument};

pub const DEFAULT_PAGE_URL: &str = "https://www.wahlrecht.de/umfragen/";
pub const DEFAULT_TABLE_SELECTOR: &str = "table.wilko";
pub const DEFAULT_USER_AGENT: &str = concat!("poll_watch/", env!("CARGO_PKG_VERSION"));

/// How table columns are turned into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// One record per institute and publication date, merged across runs.
    #[default]
    History,
    /// One record per institute holding only its latest poll, replaced each run.
    Latest,
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMode::History => write!(f, "history"),
            ExtractionMode::Latest => write!(f, "latest"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Page holding the poll table.
    pub page_url: String,
    /// Base that relative institute links are resolved against.
    pub link_base: String,
    /// CSS selector of the poll table.
    pub table_selector: String,
    pub mode: ExtractionMode,
    /// Tracked party rows, in extraction order.
    pub party_rows: Vec<PartyRow>,
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            link_base: DEFAULT_PAGE_URL.to_string(),
            table_selector: DEFAULT_TABLE_SELECTOR.to_string(),
            mode: ExtractionMode::default(),
            party_rows: default_party_rows(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// The party rows tracked on the federal overview.
pub fn default_party_rows() -> Vec<PartyRow> {
    [
        ("cdu", "CDU"),
        ("afd", "AFD"),
        ("spd", "SPD"),
        ("gru", "GRU"),
        ("lin", "LIN"),
        ("bsw", "BSW"),
        ("fdp", "FDP"),
        ("son", "Others"),
    ]
    .into_iter()
    .map(|(code, label)| PartyRow::new(code, label))
    .collect()
}

/// Load a [`ScrapeConfig`] from a YAML file. Missing fields take their defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid YAML.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_config(path: impl AsRef<Path>) -> Result<ScrapeConfig, Box<dyn Error>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    let config = parse_config(&text)?;
    info!(mode = %config.mode, party_rows = config.party_rows.len(), "Loaded configuration");
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<ScrapeConfig, Box<dyn Error>> {
    if text.trim().is_empty() {
        return Ok(ScrapeConfig::default());
    }
    Ok(serde_yaml::from_str(text)?)
}
