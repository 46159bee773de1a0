//! Model provider API types

use serde::{Deserialize, Serialize};

use crate::history::{HistoryContext, Turn};

/// Role-tagged message as sent on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: text.into(),
        }
    }

    pub fn from_turn(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

/// Chat completion request (OpenAI-compatible APIs)
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<WireMessage>,
}

impl ChatCompletionRequest {
    /// Build a request from the system prompt and reconstructed history
    pub fn from_history(
        model: impl Into<String>,
        temperature: f32,
        system: &str,
        history: &HistoryContext,
    ) -> Self {
        let mut messages = vec![WireMessage::system(system)];
        messages.extend(history.turns.iter().map(WireMessage::from_turn));
        Self {
            model: model.into(),
            temperature,
            messages,
        }
    }
}

/// Chat completion response (OpenAI-compatible APIs)
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: WireMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Messages API request (Claude)
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u64,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<WireMessage>,
}

impl MessagesRequest {
    /// Build a request from the system prompt and reconstructed history
    ///
    /// Claude takes the system instruction as a top-level field rather than
    /// as a leading system turn.
    pub fn from_history(
        model: impl Into<String>,
        max_tokens: u64,
        temperature: f32,
        system: &str,
        history: &HistoryContext,
    ) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            temperature,
            system: Some(system.to_string()),
            messages: history.turns.iter().map(WireMessage::from_turn).collect(),
        }
    }
}

/// Messages API response (Claude)
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

impl MessagesResponse {
    /// Joined text of all text content blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: String,
}
