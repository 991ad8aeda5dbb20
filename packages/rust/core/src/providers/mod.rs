//! Language-model providers used by the rewrite orchestrator.
//!
//! Each provider wraps one vendor's HTTP envelope behind [`LlmProvider`] and
//! classifies failures into [`ProviderError`], so the orchestrator can react to
//! a rate limit without inspecting status codes or message strings.

mod anthropic;
mod openai;

use async_trait::async_trait;
use reqwest::StatusCode;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Longest provider error body kept in [`ProviderError::Http`].
const MAX_ERROR_BODY: usize = 512;

/// Request envelope shared by the providers.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Why a completion call failed.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP 429: the only failure that moves the rewrite to the secondary provider.
    #[error("rate limited by provider")]
    RateLimited,

    /// HTTP 401/403: the key was rejected.
    #[error("provider rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Any other non-success status.
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Transport failure, including timeouts.
    #[error("provider request failed: {0}")]
    Network(String),

    /// The response did not carry usable text.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Map a non-success status and its body to an error.
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized {
                status: status.as_u16(),
            },
            _ => Self::Http {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            },
        }
    }
}

/// Trait implemented by concrete LLM providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Generate a completion for `request.prompt`. Empty output is an error.
    async fn complete(&self, request: &ProviderRequest<'_>) -> Result<String, ProviderError>;
}

/// Read a response, classifying failures. Returns the body of a 2xx response.
pub(crate) async fn read_success(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Network(format!("failed to read body: {e}")))?;

    if !status.is_success() {
        return Err(ProviderError::from_status(status, &body));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(ProviderError::from_status(StatusCode::TOO_MANY_REQUESTS, "").is_rate_limited());
        assert!(matches!(
            ProviderError::from_status(StatusCode::UNAUTHORIZED, "bad key"),
            ProviderError::Unauthorized { status: 401 }
        ));
        assert!(matches!(
            ProviderError::from_status(StatusCode::FORBIDDEN, ""),
            ProviderError::Unauthorized { status: 403 }
        ));

        let long_body = "x".repeat(2000);
        match ProviderError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &long_body) {
            ProviderError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
