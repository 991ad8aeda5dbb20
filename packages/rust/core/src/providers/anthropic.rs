use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use copyforge_shared::{CopyforgeError, ProviderConfig};

use super::{LlmProvider, ProviderError, ProviderRequest, read_success};

/// Messages API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages API provider (secondary).
pub struct AnthropicProvider {
    api_key: HeaderValue,
    model: String,
    endpoint: String,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(
        api_key: &str,
        config: &ProviderConfig,
        timeout: Duration,
    ) -> copyforge_shared::Result<Self> {
        let api_key = HeaderValue::from_str(api_key.trim())
            .map_err(|_| CopyforgeError::config("Anthropic API key is not a valid header value"))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CopyforgeError::Network(format!("failed to build Anthropic client: {e}"))
            })?;
        Ok(Self {
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &ProviderRequest<'_>) -> Result<String, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", self.api_key.clone());
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: vec![AnthropicContentBlock {
                    kind: "text",
                    text: request.prompt,
                }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let text = read_success(response).await?;
        let parsed: AnthropicResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("Anthropic response: {e}")))?;

        let answer = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicResponseBlock::Text { text } => Some(text),
                AnthropicResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        if answer.is_empty() {
            return Err(ProviderError::Malformed(
                "Anthropic response missing text content".into(),
            ));
        }
        debug!(model = %self.model, chars = answer.len(), "Anthropic completion received");
        Ok(answer)
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<AnthropicContentBlock<'a>>,
}

#[derive(Serialize)]
struct AnthropicContentBlock<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> AnthropicProvider {
        let config = ProviderConfig {
            api_key_env: "ANTHROPIC_API_KEY".into(),
            model: "claude-3-5-haiku-latest".into(),
            endpoint: format!("{}/v1/messages", server.uri()),
        };
        AnthropicProvider::new("ak-test", &config, Duration::from_secs(5)).unwrap()
    }

    fn request() -> ProviderRequest<'static> {
        ProviderRequest {
            prompt: "Rewrite this.",
            temperature: 0.7,
            max_tokens: 1500,
        }
    }

    #[tokio::test]
    async fn joins_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "type": "message",
                "content": [
                    { "type": "text", "text": "## Intro" },
                    { "type": "tool_use", "id": "t1", "name": "noop", "input": {} },
                    { "type": "text", "text": "## Key Takeaways" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider_for(&server).complete(&request()).await.unwrap();
        assert_eq!(text, "## Intro\n## Key Takeaways");
    }

    #[tokio::test]
    async fn server_error_is_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Http { status: 529, .. }));
    }

    #[tokio::test]
    async fn no_text_blocks_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "content": [] })),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
