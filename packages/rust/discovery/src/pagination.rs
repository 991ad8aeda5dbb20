//! Highest page number of a paginated listing.

use std::sync::Arc;

use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use copyforge_crawler::PageFetcher;
use copyforge_crawler::normalize_text;
use copyforge_shared::{CopyforgeError, Result};

/// Reads the pagination controls of the listing root page.
#[derive(Clone)]
pub struct PaginationLocator {
    fetcher: Arc<dyn PageFetcher>,
    selector: String,
}

impl PaginationLocator {
    /// `selector` matches every pagination control element.
    pub fn new(fetcher: Arc<dyn PageFetcher>, selector: &str) -> Result<Self> {
        validate_selector(selector)?;
        Ok(Self {
            fetcher,
            selector: selector.to_string(),
        })
    }

    /// Fetch the root listing page and return its page count (at least 1).
    ///
    /// A transport error fetching the root page is fatal to discovery and is returned.
    #[instrument(skip_all, fields(root = %root))]
    pub async fn locate(&self, root: &Url) -> Result<u32> {
        let html = self.fetcher.fetch(root.as_str()).await?;
        let count = parse_page_count(&html, &self.selector);
        debug!(count, "located last listing page");
        Ok(count)
    }
}

/// Maximum integer found among pagination controls, defaulting to 1.
///
/// Controls such as "Next »" or "…" carry no number and are ignored. Labels
/// like "Page 3" use their last run of digits.
pub fn parse_page_count(html: &str, selector: &str) -> u32 {
    let Ok(sel) = Selector::parse(selector) else {
        return 1;
    };
    let doc = Html::parse_document(html);

    doc.select(&sel)
        .filter_map(|el| {
            let text = normalize_text(&el.text().collect::<String>());
            text.split(|c: char| !c.is_ascii_digit())
                .filter(|run| !run.is_empty())
                .last()
                .and_then(|run| run.parse::<u32>().ok())
        })
        .fold(1, u32::max)
}

/// Reject selectors that `scraper` cannot parse.
pub(crate) fn validate_selector(selector: &str) -> Result<()> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| CopyforgeError::config(format!("invalid selector '{selector}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELECTOR: &str = ".page-numbers";

    #[test]
    fn picks_maximum_page_number() {
        let html = r#"<nav class="pagination">
            <span class="page-numbers current">1</span>
            <a class="page-numbers" href="/blogs/page/2/">2</a>
            <a class="page-numbers" href="/blogs/page/3/">3</a>
            <span class="page-numbers dots">&hellip;</span>
            <a class="page-numbers" href="/blogs/page/15/">15</a>
            <a class="next page-numbers" href="/blogs/page/2/">Next &raquo;</a>
        </nav>"#;
        assert_eq!(parse_page_count(html, SELECTOR), 15);
    }

    #[test]
    fn screen_reader_labels_still_parse() {
        let html = r#"<a class="page-numbers"><span class="screen-reader-text">Page</span> 7</a>"#;
        assert_eq!(parse_page_count(html, SELECTOR), 7);
    }

    #[test]
    fn defaults_to_one_without_pagination() {
        assert_eq!(parse_page_count("<html><body><p>Posts</p></body></html>", SELECTOR), 1);
        assert_eq!(
            parse_page_count(r#"<a class="page-numbers">Next</a>"#, SELECTOR),
            1
        );
    }

    #[test]
    fn invalid_selector_is_config_error() {
        let err = validate_selector("a[href").unwrap_err();
        assert!(err.to_string().contains("invalid selector"));
    }
}
