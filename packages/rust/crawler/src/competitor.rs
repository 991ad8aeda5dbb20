//! Text extraction from third-party competitor articles.
//!
//! Every failure (transport, HTTP status, empty page) collapses to an empty
//! string so one unreachable competitor never blocks the batch.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::extract::MarkupExtractor;
use crate::fetch::PageFetcher;

/// Fetches a competitor page, strips non-content chrome, and returns its text.
#[derive(Clone)]
pub struct CompetitorBodyExtractor {
    fetcher: Arc<dyn PageFetcher>,
    extractor: MarkupExtractor,
}

impl CompetitorBodyExtractor {
    /// `fetcher` should carry the competitor timeout and browser identity
    /// (see [`crate::HttpFetcher::for_competitors`]).
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            extractor: MarkupExtractor::competitor(),
        }
    }

    /// Extract body text; empty means "no excerpt".
    #[instrument(skip_all, fields(url = %url))]
    pub async fn extract(&self, url: &str) -> String {
        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "competitor fetch failed");
                return String::new();
            }
        };

        let body = self.extractor.extract_html(&html).body;
        debug!(body_len = body.len(), "competitor extracted");
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use copyforge_shared::{CopyforgeError, Result};

    /// Serves one fixed page for every URL, or fails every request.
    struct StaticFetcher(Option<&'static str>);

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| CopyforgeError::Network(format!("{url}: connection refused")))
        }
    }

    #[tokio::test]
    async fn extracts_main_container_without_chrome() {
        let page = r#"<html><body>
            <header>Site header</header>
            <article><h1>Ten Chatbot Tips</h1><p>Tip one.</p><iframe src="x"></iframe></article>
            <footer>Footer links</footer>
        </body></html>"#;

        let extractor = CompetitorBodyExtractor::new(Arc::new(StaticFetcher(Some(page))));
        let text = extractor.extract("https://competitor.example.com/tips").await;
        assert_eq!(text, "Ten Chatbot Tips\nTip one.");
    }

    #[tokio::test]
    async fn transport_failure_yields_empty() {
        let extractor = CompetitorBodyExtractor::new(Arc::new(StaticFetcher(None)));
        let text = extractor.extract("https://down.example.com/").await;
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn blank_page_yields_empty() {
        let extractor =
            CompetitorBodyExtractor::new(Arc::new(StaticFetcher(Some("<html><body></body></html>"))));
        assert!(extractor.extract("https://blank.example.com/").await.is_empty());
    }
}
