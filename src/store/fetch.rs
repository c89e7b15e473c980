//! HTTP access to store listing pages.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User agent for listing requests
const USER_AGENT: &str = concat!("update-overlay/", env!("CARGO_PKG_VERSION"));

/// Retrieves the text body of a URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// `reqwest`-backed page fetcher with a bounded request time
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the default user agent and timeout
    pub fn new() -> Result<Self> {
        Self::with_options(None, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a fetcher with an optional user agent override and timeout
    pub fn with_options(user_agent: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.unwrap_or(USER_AGENT))
            .timeout(timeout)
            .build()
            .map_err(|source| Error::Network {
                url: String::new(),
                source,
            })?;

        Ok(Self { client, timeout })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let network = |source| Error::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(network)?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: response.status(),
            });
        }

        response.text().await.map_err(network)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let start = Instant::now();

        // The client timeout covers the request; this also bounds body reads
        let text = tokio::time::timeout(self.timeout, self.get_text(url))
            .await
            .map_err(|_| Error::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            })??;

        tracing::debug!(
            "Fetched {} ({} bytes) in {:.1}s",
            url,
            text.len(),
            start.elapsed().as_secs_f32()
        );
        Ok(text)
    }
}
