//! Full-text scraping of primary articles found on the listing.

use std::sync::Arc;

use tracing::{debug, instrument};

use copyforge_shared::{ExtractedDocument, Result};

use crate::extract::MarkupExtractor;
use crate::fetch::PageFetcher;

/// Fetches an article page and extracts its title and body.
#[derive(Clone)]
pub struct ArticleScraper {
    fetcher: Arc<dyn PageFetcher>,
    extractor: MarkupExtractor,
}

impl ArticleScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            extractor: MarkupExtractor::article(),
        }
    }

    /// Fetch errors propagate; an extraction miss yields empty strings.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn scrape(&self, url: &str) -> Result<ExtractedDocument> {
        let html = self.fetcher.fetch(url).await?;
        let doc = self.extractor.extract_html(&html);
        debug!(title = %doc.title, body_len = doc.body.len(), "article extracted");
        Ok(doc)
    }
}
