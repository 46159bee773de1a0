//! Model provider HTTP client

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::{LlmConfig, ModelProvider};
use crate::error::{Error, Result};
use crate::history::HistoryContext;

use super::types::*;

/// Token budget for Claude replies; OpenAI-compatible APIs default server-side
const CLAUDE_MAX_TOKENS: u64 = 1024;

/// External model collaborator
///
/// The trait is the seam between the conversation service and the provider:
/// tests swap in stubs, production wires in [`ModelClient`].
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a reply for the reconstructed history
    ///
    /// The final turn of `history` is the new user input.
    async fn complete(&self, system: &str, history: &HistoryContext) -> Result<String>;
}

/// HTTP client for the model provider (OpenAI-compatible or Claude)
#[derive(Clone)]
pub struct ModelClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    provider: ModelProvider,
}

impl ModelClient {
    /// Create a new client from LLM configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::Http)?;

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => match config.provider {
                ModelProvider::OpenAi => "https://api.openai.com/v1".to_string(),
                ModelProvider::Claude => "https://api.anthropic.com/v1".to_string(),
            },
        };

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url,
            temperature: config.temperature,
            provider: config.provider.clone(),
        })
    }

    /// Create with custom base URL (for testing or custom endpoints)
    pub fn with_base_url(config: &LlmConfig, base_url: String) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url;
        Ok(client)
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the provider type
    pub fn provider(&self) -> &ModelProvider {
        &self.provider
    }

    /// Send request to an OpenAI-compatible chat-completions API
    async fn send_openai_request(
        &self,
        system: &str,
        history: &HistoryContext,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest::from_history(
            self.model.clone(),
            self.temperature,
            system,
            history,
        );

        debug!("Sending {} turns to chat-completions API: {}", history.len(), url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("Chat-completions API error: {} - {}", status, body);
            return Err(Error::Provider(format!("{}: {}", status, body)));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Provider(format!("Failed to parse response: {} - {}", e, body)))?;

        parsed
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| Error::Provider("Response contained no choices".to_string()))
    }

    /// Send request to the Claude Messages API
    async fn send_claude_request(
        &self,
        system: &str,
        history: &HistoryContext,
    ) -> Result<String> {
        let url = format!("{}/messages", self.base_url);
        let request = MessagesRequest::from_history(
            self.model.clone(),
            CLAUDE_MAX_TOKENS,
            self.temperature,
            system,
            history,
        );

        debug!("Sending {} turns to Claude API: {}", history.len(), url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("Claude API error: {} - {}", status, body);
            return Err(Error::Provider(format!("{}: {}", status, body)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Provider(format!("Failed to parse response: {} - {}", e, body)))?;

        let text = parsed.text();
        if text.is_empty() {
            return Err(Error::Provider("Response contained no text blocks".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl ChatModel for ModelClient {
    async fn complete(&self, system: &str, history: &HistoryContext) -> Result<String> {
        match self.provider {
            ModelProvider::OpenAi => self.send_openai_request(system, history).await,
            ModelProvider::Claude => self.send_claude_request(system, history).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Turn;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(provider: ModelProvider) -> LlmConfig {
        LlmConfig {
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            provider,
            base_url: None,
            temperature: 0.7,
            timeout_secs: 5,
        }
    }

    fn history() -> HistoryContext {
        HistoryContext {
            turns: vec![Turn::user("hello")],
        }
    }

    #[tokio::test]
    async fn test_openai_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "temperature": 0.7,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hi there"}}]
            })))
            .mount(&server)
            .await;

        let client =
            ModelClient::with_base_url(&config(ModelProvider::OpenAi), server.uri()).unwrap();
        let reply = client.complete("be helpful", &history()).await.unwrap();
        assert_eq!(reply, "hi there");
    }

    #[tokio::test]
    async fn test_claude_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "hi there"}],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let client =
            ModelClient::with_base_url(&config(ModelProvider::Claude), server.uri()).unwrap();
        let reply = client.complete("be helpful", &history()).await.unwrap();
        assert_eq!(reply, "hi there");
    }

    #[tokio::test]
    async fn test_error_status_surfaces_as_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client =
            ModelClient::with_base_url(&config(ModelProvider::OpenAi), server.uri()).unwrap();
        let err = client.complete("be helpful", &history()).await;
        assert!(matches!(err, Err(Error::Provider(_))));
    }

    #[tokio::test]
    async fn test_unparseable_body_surfaces_as_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client =
            ModelClient::with_base_url(&config(ModelProvider::OpenAi), server.uri()).unwrap();
        let err = client.complete("be helpful", &history()).await;
        assert!(matches!(err, Err(Error::Provider(_))));
    }
}
