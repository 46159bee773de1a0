//! HTTP API handlers
//!
//! Request handlers for chat and conversation management.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use sc_core::{Conversation, StoredMessage};

use crate::error::ApiError;
use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Chat request payload
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// User message
    pub message: String,
    /// Session ID for conversation continuity
    pub session_id: Option<String>,
}

/// Chat response payload
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Generated reply text
    pub response: String,
    /// Session ID (for subsequent requests)
    pub session_id: String,
}

/// One message of a conversation as exposed over the API
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<StoredMessage> for MessageResponse {
    fn from(message: StoredMessage) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content,
            timestamp: message.timestamp,
        }
    }
}

/// A conversation with its messages as exposed over the API
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: i64,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<MessageResponse>,
}

impl From<(Conversation, Vec<StoredMessage>)> for ConversationResponse {
    fn from((conversation, messages): (Conversation, Vec<StoredMessage>)) -> Self {
        Self {
            id: conversation.id,
            session_id: conversation.session_id,
            created_at: conversation.created_at,
            messages: messages.into_iter().map(MessageResponse::from).collect(),
        }
    }
}

// ============================================================================
// Handler functions
// ============================================================================

/// Liveness marker
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Smart Chat API is running" }))
}

/// Chat endpoint - persist the exchange and return the generated reply
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    debug!("Chat request, session_id={:?}", req.session_id);

    let outcome = state.service.handle_chat(&req.message, req.session_id).await?;

    Ok(Json(ChatResponse {
        response: outcome.reply,
        session_id: outcome.session_id,
    }))
}

/// List all conversations
pub async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConversationResponse>>, ApiError> {
    let conversations = state
        .service
        .list_conversations()?
        .into_iter()
        .map(ConversationResponse::from)
        .collect();
    Ok(Json(conversations))
}

/// Get a specific conversation
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    debug!("Conversation request: {}", session_id);
    let conversation = state.service.get_conversation(&session_id)?;
    Ok(Json(ConversationResponse::from(conversation)))
}

/// Delete a conversation and its messages
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.service.delete_conversation(&session_id)?;
    info!("Deleted conversation: {}", session_id);
    Ok(Json(json!({ "message": "Conversation deleted successfully" })))
}
