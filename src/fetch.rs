//! Retrieval of the raw poll page.
//!
//! - [`Fetch`]: the seam the pipeline depends on
//! - [`HttpFetcher`]: a single HTTP GET via `reqwest`
//!
//! Any failure, including a non-success HTTP status, is fatal for the run.
//! No retries are attempted.

use crate::utils::truncate_for_log;
use reqwest::Client;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Something that can return the markup behind a URL.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

/// Plain HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = async {
            let body = self
                .client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            Ok::<_, reqwest::Error>(body)
        }
        .await;
        let dt = t0.elapsed();

        match res {
            Ok(body) => {
                info!(bytes = body.len(), elapsed_ms = dt.as_millis() as u64, "Fetched poll page");
                debug!(preview = %truncate_for_log(&body, 200), "Poll page body");
                Ok(body)
            }
            Err(e) => {
                error!(elapsed_ms = dt.as_millis() as u64, error = %e, "Fetching poll page failed");
                Err(Box::new(e))
            }
        }
    }
}

/// Fetcher returning canned markup, for tests.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    pub body: Option<String>,
}

#[cfg(test)]
impl StaticFetcher {
    pub fn new(body: &str) -> Self {
        Self {
            body: Some(body.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { body: None }
    }
}

#[cfg(test)]
impl Fetch for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>> {
        self.body
            .clone()
            .ok_or_else(|| format!("connection refused: {url}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher() {
        let ok = StaticFetcher::new("<html></html>");
        assert_eq!(ok.fetch("https://example.com").await.unwrap(), "<html></html>");

        let err = StaticFetcher::failing().fetch("https://example.com").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new("poll_watch/test").is_ok());
    }
}
