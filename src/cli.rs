//! Command-line interface definitions for the poll watcher.
//!
//! All arguments can be provided via command-line flags or environment variables.

use crate::config::{ExtractionMode, ScrapeConfig};
use clap::Parser;

/// Command-line arguments for the poll watcher.
///
/// # Examples
///
/// ```sh
/// # Track the full poll history in ./poll_state.json
/// poll_watch
///
/// # Keep only the latest poll per institute and write a change report
/// poll_watch --mode latest -s /var/lib/polls/state.json -j ./reports
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// JSON file holding the persisted poll state
    #[arg(short, long, env = "POLL_STATE_FILE", default_value = "poll_state.json")]
    pub state_file: String,

    /// Page to scrape (overrides the config file)
    #[arg(short, long, env = "POLL_PAGE_URL")]
    pub url: Option<String>,

    /// Extraction mode (overrides the config file)
    #[arg(long, value_enum)]
    pub mode: Option<ExtractionMode>,

    /// Optional output directory for a JSON report of changed polls
    #[arg(short, long)]
    pub json_output_dir: Option<String>,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, mut config: ScrapeConfig) -> ScrapeConfig {
        if let Some(url) = &self.url {
            config.page_url = url.clone();
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["poll_watch"]);
        assert!(cli.config.is_none());
        assert!(cli.json_output_dir.is_none());
        assert!(cli.mode.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "poll_watch",
            "-s",
            "/tmp/state.json",
            "-j",
            "/tmp/reports",
            "-c",
            "config.yaml",
        ]);

        assert_eq!(cli.state_file, "/tmp/state.json");
        assert_eq!(cli.json_output_dir.as_deref(), Some("/tmp/reports"));
        assert_eq!(cli.config.as_deref(), Some("config.yaml"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "poll_watch",
            "--mode",
            "latest",
            "--url",
            "https://www.wahlrecht.de/umfragen/index.htm",
        ]);
        let config = cli.apply(ScrapeConfig::default());
        assert_eq!(config.mode, ExtractionMode::Latest);
        assert_eq!(config.page_url, "https://www.wahlrecht.de/umfragen/index.htm");
        assert_eq!(config.table_selector, "table.wilko");
    }
}
