//! Oldest-first article discovery on a paginated listing.
//!
//! The listing is assumed to be ordered newest-first: page 1 holds the newest
//! posts and each page lists posts newest-to-oldest from top to bottom. Walking
//! from the last page toward page 1 and reversing each page's links therefore
//! yields links oldest-first across the whole listing.

use std::collections::HashSet;
use std::sync::Arc;

use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use copyforge_crawler::PageFetcher;
use copyforge_shared::{CopyforgeError, ListingConfig, Result};

use crate::pagination::{PaginationLocator, validate_selector};

/// Collects the oldest article links of a listing, in oldest-first order.
#[derive(Clone)]
pub struct OldestArticleSelector {
    fetcher: Arc<dyn PageFetcher>,
    locator: PaginationLocator,
    root_url: Url,
    link_selector: String,
}

impl OldestArticleSelector {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        root_url: Url,
        pagination_selector: &str,
        link_selector: &str,
    ) -> Result<Self> {
        validate_selector(link_selector)?;
        let locator = PaginationLocator::new(fetcher.clone(), pagination_selector)?;
        Ok(Self {
            fetcher,
            locator,
            root_url: with_trailing_slash(root_url),
            link_selector: link_selector.to_string(),
        })
    }

    /// Build from the `[listing]` config section.
    pub fn from_config(fetcher: Arc<dyn PageFetcher>, config: &ListingConfig) -> Result<Self> {
        let root_url = Url::parse(&config.root_url).map_err(|e| {
            CopyforgeError::config(format!("invalid listing root_url '{}': {e}", config.root_url))
        })?;
        Self::new(
            fetcher,
            root_url,
            &config.pagination_selector,
            &config.article_link_selector,
        )
    }

    /// Return at most `limit` distinct article URLs, oldest first.
    ///
    /// Fails only when the root page (pagination) cannot be fetched. A listing
    /// page that fails to load is logged and treated as empty.
    #[instrument(skip_all, fields(root = %self.root_url, limit))]
    pub async fn select_oldest(&self, limit: usize) -> Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let last_page = self.locator.locate(&self.root_url).await?;
        info!(last_page, "last listing page found");

        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(limit);
        let mut page = last_page;

        while selected.len() < limit && page > 0 {
            let url = listing_page_url(&self.root_url, page);
            debug!(%url, page, "scanning listing page");

            match self.fetcher.fetch(&url).await {
                Ok(html) => {
                    let mut links = extract_article_links(&html, &self.link_selector, &self.root_url);
                    links.reverse();
                    for link in links {
                        if selected.len() >= limit {
                            break;
                        }
                        if seen.insert(link.clone()) {
                            selected.push(link);
                        }
                    }
                }
                Err(e) => {
                    warn!(%url, error = %e, "listing page fetch failed, treating as empty");
                }
            }

            page -= 1;
        }

        info!(count = selected.len(), "selected oldest article links");
        Ok(selected)
    }
}

/// URL of listing page `page`: the root for page 1, `{root}page/{n}/` otherwise.
pub fn listing_page_url(root: &Url, page: u32) -> String {
    if page <= 1 {
        return root.to_string();
    }
    root.join(&format!("page/{page}/"))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{root}page/{page}/"))
}

/// Article links of one listing page in on-page order, resolved against `base`
/// and deduplicated (first occurrence wins).
pub fn extract_article_links(html: &str, selector: &str, base: &Url) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();

    doc.select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| {
            !(href.is_empty()
                || href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:"))
        })
        .filter_map(|href| base.join(href).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Relative page paths only resolve under the root when it ends with `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
