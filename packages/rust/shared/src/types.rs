//! Core domain types for the content-enhancement pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of reference URLs stored on an article.
pub const MAX_REFERENCES: usize = 10;

/// Maximum number of competitor articles used per rewrite.
pub const MAX_COMPETITORS: usize = 2;

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for article identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub Uuid);

impl ArticleId {
    /// Generate a new time-sortable article identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArticleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A stored article. `original_url` uniqueness is enforced by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub original_content: String,
    pub original_url: String,
    /// Rewritten content, set by a successful enhancement pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_content: Option<String>,
    /// Competitor URLs used for the rewrite, in search-ranked order.
    #[serde(default)]
    pub references: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Transient pipeline values
// ---------------------------------------------------------------------------

/// Cleaned `(title, body)` pair produced by markup extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub title: String,
    pub body: String,
}

impl ExtractedDocument {
    /// True when no body text was found.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Cleaned third-party article text used only as prompt input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitorExcerpt {
    pub source_url: String,
    pub text: String,
}

/// Input to the rewrite orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    pub original_text: String,
    /// At most [`MAX_COMPETITORS`] excerpts, in search-ranked order.
    pub competitor_excerpts: Vec<CompetitorExcerpt>,
}

impl RewriteRequest {
    /// Build a request, dropping excerpts beyond [`MAX_COMPETITORS`].
    pub fn new(original_text: impl Into<String>, mut excerpts: Vec<CompetitorExcerpt>) -> Self {
        excerpts.truncate(MAX_COMPETITORS);
        Self {
            original_text: original_text.into(),
            competitor_excerpts: excerpts,
        }
    }
}

/// Which path produced a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderUsed {
    Primary,
    Secondary,
    Passthrough,
}

impl ProviderUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Passthrough => "passthrough",
        }
    }
}

impl std::fmt::Display for ProviderUsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the rewrite orchestrator; always present, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub text: String,
    pub provider_used: ProviderUsed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_roundtrip() {
        let id = ArticleId::new();
        let s = id.to_string();
        let parsed: ArticleId = s.parse().expect("parse ArticleId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn article_serialization() {
        let article = Article {
            id: ArticleId::new(),
            title: "Chatbots for Small Business".into(),
            original_content: "Body".into(),
            original_url: "https://blog.example.com/chatbots/".into(),
            updated_content: None,
            references: vec![],
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&article).expect("serialize");
        assert!(!json.contains("updated_content"));
        let parsed: Article = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, article);
    }

    #[test]
    fn rewrite_request_caps_excerpts() {
        let excerpts = (0..5)
            .map(|i| CompetitorExcerpt {
                source_url: format!("https://c{i}.example.com/"),
                text: format!("excerpt {i}"),
            })
            .collect();
        let request = RewriteRequest::new("original", excerpts);
        assert_eq!(request.competitor_excerpts.len(), MAX_COMPETITORS);
        assert_eq!(request.competitor_excerpts[1].text, "excerpt 1");
    }

    #[test]
    fn provider_used_labels() {
        assert_eq!(ProviderUsed::Primary.to_string(), "primary");
        assert_eq!(
            serde_json::to_string(&ProviderUsed::Passthrough).unwrap(),
            r#""passthrough""#
        );
    }
}
