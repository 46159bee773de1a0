//! Route definitions
//!
//! Defines all HTTP API endpoints.

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers::{chat, delete_conversation, get_conversation, list_conversations, root};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Liveness
        .route("/", get(root))
        // Chat endpoint
        .route("/chat", post(chat))
        // Conversation management
        .route("/conversations", get(list_conversations))
        .route("/conversations/{session_id}", get(get_conversation))
        .route("/conversations/{session_id}", delete(delete_conversation))
}
