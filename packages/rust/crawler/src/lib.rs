//! Page fetching and content extraction.
//!
//! This crate provides:
//! - [`PageFetcher`]: the fetch seam, with the reqwest-backed [`HttpFetcher`]
//! - [`MarkupExtractor`]: selector-chain extraction of `(title, body)`
//! - [`ArticleScraper`]: full text of listing articles
//! - [`CompetitorBodyExtractor`]: noise-stripped text of third-party pages

pub mod article;
pub mod competitor;
pub mod extract;
pub mod fetch;
pub mod normalize;

pub use article::ArticleScraper;
pub use competitor::CompetitorBodyExtractor;
pub use extract::MarkupExtractor;
pub use fetch::{HttpFetcher, PageFetcher};
pub use normalize::normalize_text;
