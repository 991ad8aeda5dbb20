use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use copyforge_shared::{CopyforgeError, ProviderConfig};

use super::{LlmProvider, ProviderError, ProviderRequest, read_success};

/// OpenAI-compatible chat completions provider (primary).
pub struct OpenAiProvider {
    auth: HeaderValue,
    model: String,
    endpoint: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        config: &ProviderConfig,
        timeout: Duration,
    ) -> copyforge_shared::Result<Self> {
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| CopyforgeError::config("OpenAI API key is not a valid header value"))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CopyforgeError::Network(format!("failed to build OpenAI client: {e}")))?;
        Ok(Self {
            auth,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ProviderRequest<'_>) -> Result<String, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.auth.clone());

        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: request.prompt,
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
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("OpenAI response: {e}")))?;

        let answer = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(ProviderError::Malformed(
                "OpenAI response missing message content".into(),
            ));
        }
        debug!(model = %self.model, chars = answer.len(), "OpenAI completion received");
        Ok(answer)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        let config = ProviderConfig {
            api_key_env: "OPENAI_API_KEY".into(),
            model: "gpt-3.5-turbo".into(),
            endpoint: format!("{}/v1/chat/completions", server.uri()),
        };
        OpenAiProvider::new("sk-test", &config, Duration::from_secs(5)).unwrap()
    }

    fn request() -> ProviderRequest<'static> {
        ProviderRequest {
            prompt: "Rewrite this.",
            temperature: 0.7,
            max_tokens: 1500,
        }
    }

    #[tokio::test]
    async fn parses_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 1500,
                "messages": [{ "role": "user", "content": "Rewrite this." }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": "## Better\n" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider_for(&server).complete(&request()).await.unwrap();
        assert_eq!(text, "## Better");
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn rejected_key_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized { status: 401 }));
    }

    #[tokio::test]
    async fn empty_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "  " } }]
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
