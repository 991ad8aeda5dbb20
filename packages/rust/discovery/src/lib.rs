//! Article and competitor discovery.
//!
//! - [`PaginationLocator`] finds the last page of a blog listing
//! - [`OldestArticleSelector`] walks the listing backwards for the oldest posts
//! - [`CompetitorFinder`] asks a search API for competing articles on a topic

pub mod listing;
pub mod pagination;
pub mod search;

pub use listing::{OldestArticleSelector, extract_article_links, listing_page_url};
pub use pagination::{PaginationLocator, parse_page_count};
pub use search::{CompetitorFinder, MOCK_COMPETITORS};
