use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, warn};

use crate::error::LookupError;
use crate::settings::Settings;

/// Where to fetch a page from, relative to the registry endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Search by name: `index.php?name=<UPPERCASED>`.
    Query(String),
    /// Endpoint-relative path taken from a detail link.
    Path(String),
}

/// A fetched HTML document.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub body: String,
}

impl Page {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, locator: &Locator) -> Result<Page, LookupError>;
}

/// HTTP page source with a shared connection pool and connect-level retries.
pub struct Fetcher {
    client: reqwest::Client,
    base: Url,
    retries: u32,
    backoff: Duration,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::build(
            &settings.base_url,
            settings.timeout(),
            settings.retries,
            settings.backoff(),
        )
    }

    pub fn build(base_url: &str, timeout: Duration, retries: u32, backoff: Duration) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends in '/'
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).with_context(|| format!("Invalid base URL: {}", base_url))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base,
            retries,
            backoff,
        })
    }

    pub fn url_for(&self, locator: &Locator) -> Result<Url, LookupError> {
        match locator {
            Locator::Query(name) => {
                let mut url = self
                    .base
                    .join("index.php")
                    .map_err(|e| LookupError::Locator(e.to_string()))?;
                url.query_pairs_mut().append_pair("name", &name.to_uppercase());
                Ok(url)
            }
            Locator::Path(target) => self
                .base
                .join(target)
                .map_err(|e| LookupError::Locator(format!("{}: {}", target, e))),
        }
    }

    async fn get_once(&self, url: &Url) -> Result<Page, LookupError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| LookupError::Connection {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Transport {
                status,
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| LookupError::Connection {
                url: url.to_string(),
                source,
            })?;

        Ok(Page::new(url.as_str(), body))
    }
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch(&self, locator: &Locator) -> Result<Page, LookupError> {
        let url = self.url_for(locator)?;

        let mut attempt = 0;
        loop {
            match self.get_once(&url).await {
                Err(LookupError::Connection { source, .. })
                    if is_retryable(&source) && attempt < self.retries =>
                {
                    let backoff = backoff_for(self.backoff, attempt);
                    warn!(
                        "Connection failure on {} (attempt {}/{}), backing off {:.1}s: {}",
                        url,
                        attempt + 1,
                        self.retries,
                        backoff.as_secs_f64(),
                        source
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                result => {
                    debug!(url = %url, ok = result.is_ok(), "fetched");
                    return result;
                }
            }
        }
    }
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// `base * 2^attempt`, saturating for large retry counts.
fn backoff_for(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}
