//! Whitespace normalization for extracted text.
//!
//! Runs of horizontal whitespace collapse to one space, runs of two or more
//! newlines collapse to one newline, and the result is trimmed.

use std::sync::LazyLock;

use regex::Regex;

/// Collapse whitespace in text pulled out of a document.
pub fn normalize_text(text: &str) -> String {
    static HORIZONTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[ \t\r\x0B\x0C\u{a0}]+").expect("valid regex")
    });
    // Spaces hugging a newline would otherwise keep blank lines alive.
    static EDGE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r" ?\n ?").expect("valid regex")
    });
    static MULTI_NEWLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\n{2,}").expect("valid regex")
    });

    let result = HORIZONTAL_RE.replace_all(text, " ");
    let result = EDGE_RE.replace_all(&result, "\n");
    let result = MULTI_NEWLINE_RE.replace_all(&result, "\n");
    result.trim().to_string()
}
