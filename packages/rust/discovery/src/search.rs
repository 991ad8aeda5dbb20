//! Competitor discovery through a web search API.
//!
//! Without a usable API key the finder returns [`MOCK_COMPETITORS`] and never
//! touches the network, which keeps offline runs deterministic.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use copyforge_shared::{
    AppConfig, CopyforgeError, HttpConfig, MAX_COMPETITORS, Result, SearchConfig,
    resolve_credential, usable_credential,
};

/// Stand-in results used when no search credential is configured.
pub const MOCK_COMPETITORS: [&str; 2] = [
    "https://example.com/competitor-article-1",
    "https://example.com/competitor-article-2",
];

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: Option<String>,
}

// ---------------------------------------------------------------------------
// CompetitorFinder
// ---------------------------------------------------------------------------

/// Finds the top-ranked competitor articles for a topic.
#[derive(Debug, Clone)]
pub struct CompetitorFinder {
    client: Client,
    endpoint: String,
    engine: String,
    api_key: Option<String>,
    max_results: usize,
}

impl CompetitorFinder {
    /// `api_key` is filtered through the placeholder rules; a placeholder
    /// behaves exactly like `None`.
    pub fn new(search: &SearchConfig, http: &HttpConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(http.user_agent.as_str())
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()
            .map_err(|e| CopyforgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: search.endpoint.clone(),
            engine: search.engine.clone(),
            api_key: usable_credential(api_key),
            max_results: search.max_results.min(MAX_COMPETITORS),
        })
    }

    /// Build from config, reading the key from the configured env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let key = resolve_credential(&config.search.api_key_env);
        Self::new(&config.search, &config.http, key)
    }

    /// Whether searches are answered with the fixed mock set.
    pub fn is_mock(&self) -> bool {
        self.api_key.is_none()
    }

    /// Return at most two competitor URLs in provider-ranked order.
    ///
    /// Search failures are tolerated: the result is simply empty.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn find(&self, topic: &str) -> Vec<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            info!("no search credential configured, using mock competitors");
            return MOCK_COMPETITORS.iter().map(|s| s.to_string()).collect();
        };

        match self.search(api_key, topic).await {
            Ok(links) => {
                debug!(count = links.len(), "competitors found");
                links
            }
            Err(e) => {
                warn!(error = %e, "competitor search failed, continuing without competitors");
                Vec::new()
            }
        }
    }

    async fn search(&self, api_key: &str, topic: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("api_key", api_key), ("q", topic), ("engine", self.engine.as_str())])
            .send()
            .await
            .map_err(|e| CopyforgeError::Network(format!("search request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CopyforgeError::Network(format!("search: HTTP {status}")));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CopyforgeError::parse(format!("search response: {e}")))?;

        Ok(top_links(body, self.max_results))
    }
}

/// Links of the first `n` organic results; entries without a link are skipped.
fn top_links(body: SearchResponse, n: usize) -> Vec<String> {
    body.organic_results
        .into_iter()
        .take(n)
        .filter_map(|r| r.link)
        .filter(|link| !link.is_empty())
        .collect()
}
