//! Markup extraction driven by selector fallback chains.
//!
//! A chain is an ordered list of CSS selectors. Each selector is tried in turn
//! and the first one whose first matching element yields non-empty text wins.
//! Adding or reordering strategies is a change to the constants below, not to
//! the evaluation code.

use scraper::{ElementRef, Html, Node, Selector};

use copyforge_shared::ExtractedDocument;

use crate::normalize::normalize_text;

/// Title chain: primary heading component, then the first top-level heading.
pub const TITLE_CHAIN: &[&str] = &[".elementor-heading-title", "h1"];

/// Body chain: site post widget, semantic article containers, common content
/// classes, then generic content roots.
pub const ARTICLE_BODY_CHAIN: &[&str] = &[
    "#content .elementor-widget-theme-post-content",
    "article",
    r#"[itemprop="articleBody"]"#,
    ".entry-content",
    ".post-content",
    ".article-content",
    "#content",
    "main",
    "body",
];

/// Competitor body chain. Same priorities without the generic `body` root,
/// which is covered by the whole-document fallback instead.
pub const COMPETITOR_BODY_CHAIN: &[&str] = &[
    "article",
    r#"[itemprop="articleBody"]"#,
    ".entry-content",
    ".post-content",
    ".article-content",
    "main",
    r#"[role="main"]"#,
    "#content",
    ".content",
];

/// Elements removed from competitor pages before any chain is evaluated.
pub const COMPETITOR_NOISE: &[&str] = &[
    "nav",
    "header",
    "footer",
    "aside",
    "iframe",
    "form",
    "[role=\"navigation\"]",
    "[class*=\"advert\"]",
    "[id*=\"advert\"]",
    ".ad",
    ".ads",
    ".sidebar",
    ".cookie-banner",
    ".newsletter",
];

/// Elements whose text never counts as content.
const SKIPPED_TAGS: &[&str] = &[
    "head", "title", "script", "style", "noscript", "template", "svg",
];

/// Elements that start a new line in extracted text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4",
    "h5", "h6", "blockquote", "pre", "table", "tr", "td", "th", "dl", "dt", "dd", "hr", "figure",
    "figcaption", "header", "footer",
];

/// Returns a cleaned `(title, body)` pair from a parsed document. Never fails:
/// a total miss yields empty strings.
#[derive(Debug, Clone, Copy)]
pub struct MarkupExtractor {
    title_chain: &'static [&'static str],
    body_chain: &'static [&'static str],
    noise: &'static [&'static str],
    whole_document_fallback: bool,
}

impl MarkupExtractor {
    /// Extractor for primary articles from the listing.
    pub fn article() -> Self {
        Self {
            title_chain: TITLE_CHAIN,
            body_chain: ARTICLE_BODY_CHAIN,
            noise: &[],
            whole_document_fallback: false,
        }
    }

    /// Stricter extractor for third-party pages: strips chrome and ads first,
    /// falls back to whole-document text when no container matches.
    pub fn competitor() -> Self {
        Self {
            title_chain: TITLE_CHAIN,
            body_chain: COMPETITOR_BODY_CHAIN,
            noise: COMPETITOR_NOISE,
            whole_document_fallback: true,
        }
    }

    /// Extract title and body text from `doc`.
    pub fn extract(&self, doc: &Html) -> ExtractedDocument {
        let title = first_non_empty(doc, self.title_chain)
            .map(|t| t.replace('\n', " "))
            .unwrap_or_default();

        let body = if self.noise.is_empty() {
            self.body_of(doc)
        } else {
            let mut stripped = doc.clone();
            strip_elements(&mut stripped, self.noise);
            self.body_of(&stripped)
        };

        ExtractedDocument { title, body }
    }

    /// Parse raw HTML and extract from it.
    pub fn extract_html(&self, html: &str) -> ExtractedDocument {
        self.extract(&Html::parse_document(html))
    }

    fn body_of(&self, doc: &Html) -> String {
        first_non_empty(doc, self.body_chain)
            .or_else(|| {
                self.whole_document_fallback
                    .then(|| element_text(document_body(doc)))
                    .filter(|text| !text.is_empty())
            })
            .unwrap_or_default()
    }
}

/// The `<body>` element, or the root when the parser produced none.
fn document_body(doc: &Html) -> ElementRef<'_> {
    Selector::parse("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .unwrap_or_else(|| doc.root_element())
}

/// Evaluate a chain: text of the first element matched by the first selector
/// that yields non-empty normalized text.
pub fn first_non_empty(doc: &Html, chain: &[&str]) -> Option<String> {
    chain
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|sel| {
            doc.select(&sel)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty())
        })
}

/// Normalized visible text of an element, with block boundaries as newlines.
pub fn element_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    normalize_text(&raw)
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    let block = BLOCK_TAGS.contains(&name);
                    if block {
                        out.push('\n');
                    }
                    collect_text(child_el, out);
                    if block {
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }
}

/// Detach every element matching any of `selectors` from the document tree.
fn strip_elements(doc: &mut Html, selectors: &[&str]) {
    for sel in selectors.iter().filter_map(|css| Selector::parse(css).ok()) {
        let ids: Vec<_> = doc.select(&sel).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}
