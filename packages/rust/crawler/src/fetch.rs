//! Page fetching seam shared by every component that talks to the web.
//!
//! Components take an `Arc<dyn PageFetcher>` in their constructor instead of
//! reaching for a process-wide client, so tests can inject fake fetchers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tracing::debug;

use copyforge_shared::{CopyforgeError, HttpConfig, Result};

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Fetches a URL and returns the response body of a successful response.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url`; transport errors and non-2xx statuses are [`CopyforgeError::Network`].
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// reqwest-backed fetcher with a browser-like identity and a per-call timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher from the `[http]` config section with the given per-call timeout.
    pub fn new(config: &HttpConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let language = HeaderValue::from_str(&config.accept_language).map_err(|e| {
            CopyforgeError::config(format!(
                "invalid accept_language '{}': {e}",
                config.accept_language
            ))
        })?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| CopyforgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetcher for listing and article pages (`http.timeout_secs`).
    pub fn for_pages(config: &HttpConfig) -> Result<Self> {
        Self::new(config, Duration::from_secs(config.timeout_secs))
    }

    /// Fetcher for third-party competitor pages (`http.competitor_timeout_secs`).
    pub fn for_competitors(config: &HttpConfig) -> Result<Self> {
        Self::new(config, Duration::from_secs(config.competitor_timeout_secs))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CopyforgeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CopyforgeError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| CopyforgeError::Network(format!("{url}: body read failed: {e}")))
    }
}
