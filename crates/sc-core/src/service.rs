//! Conversation service
//!
//! Orchestrates session resolution, message persistence, history assembly,
//! and the model provider call for one chat request.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::{error, info};

use crate::history::ContextAssembler;
use crate::llm::ChatModel;
use crate::session::{Conversation, ConversationStore, Role, StoredMessage};
use crate::Result;

/// Fixed system instruction sent with every model call
pub const SYSTEM_PROMPT: &str = "You are a helpful, intelligent AI assistant. \
Your goal is to provide accurate, helpful, and engaging responses to user queries.

Key guidelines:
- Be concise but thorough
- Use examples when helpful
- Ask clarifying questions if needed
- Maintain context from previous messages
- Be friendly and professional

Current conversation context is provided below.";

/// Reply shown (and persisted) when the model provider call fails
pub const FALLBACK_REPLY: &str =
    "I apologize, but I encountered an error processing your request.";

/// Result of one handled chat request
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: String,
    pub session_id: String,
}

/// Conversation service
///
/// All mutations for one session id run under that session's lock, so two
/// concurrent first contacts with the same id cannot create divergent
/// conversations and sequence markers stay strictly increasing. Requests for
/// distinct sessions proceed in parallel; the store's connection mutex only
/// serializes the short database operations themselves.
pub struct ChatService {
    store: Arc<Mutex<ConversationStore>>,
    model: Arc<dyn ChatModel>,
    assembler: ContextAssembler,
    /// Per-session lock registry, created lazily and kept for the process lifetime
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    system_prompt: String,
}

impl ChatService {
    /// Create a new service over a store and model provider
    pub fn new(store: ConversationStore, model: Arc<dyn ChatModel>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            model,
            assembler: ContextAssembler::new(),
            locks: DashMap::new(),
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Replace the default system instruction
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Replace the default (unbounded) context assembler
    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Handle one chat request
    ///
    /// Persists the user message, reconstructs the history (which then ends
    /// with that message), asks the model for a reply, and persists whatever
    /// the user actually gets to see — the generated text, or the fixed
    /// fallback when the provider call fails. The provider error itself is
    /// logged and never propagated to the caller.
    pub async fn handle_chat(
        &self,
        message: &str,
        session_id: Option<String>,
    ) -> Result<ChatOutcome> {
        // Generate the id up front so the whole call runs under its lock
        let session_id = match session_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => uuid::Uuid::new_v4().to_string(),
        };

        let lock = self.session_lock(&session_id);
        let _guard = lock.lock().await;

        let history = {
            let store = self.store.lock().unwrap();
            let (_, is_new) = store.resolve_or_create(Some(&session_id))?;
            if is_new {
                info!("Created conversation for session: {}", session_id);
            }
            store.append_message(&session_id, Role::User, message)?;
            self.assembler.build(&store.list_messages(&session_id)?)
        };

        let reply = match self.model.complete(&self.system_prompt, &history).await {
            Ok(text) => text,
            Err(e) => {
                error!("Model provider call failed for session {}: {}", session_id, e);
                FALLBACK_REPLY.to_string()
            }
        };

        {
            let store = self.store.lock().unwrap();
            store.append_message(&session_id, Role::Assistant, &reply)?;
        }

        Ok(ChatOutcome { reply, session_id })
    }

    /// List all conversations with their messages
    pub fn list_conversations(&self) -> Result<Vec<(Conversation, Vec<StoredMessage>)>> {
        let store = self.store.lock().unwrap();
        store.list_conversations()
    }

    /// Get one conversation with its messages
    pub fn get_conversation(
        &self,
        session_id: &str,
    ) -> Result<(Conversation, Vec<StoredMessage>)> {
        let store = self.store.lock().unwrap();
        store.get_conversation(session_id)
    }

    /// Delete a conversation and its messages
    pub fn delete_conversation(&self, session_id: &str) -> Result<()> {
        let store = self.store.lock().unwrap();
        store.delete_conversation(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryContext;
    use crate::{Error, Result};
    use async_trait::async_trait;

    /// Stub model that echoes the last user turn
    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn complete(&self, _system: &str, history: &HistoryContext) -> Result<String> {
            let last = history.turns.last().map(|t| t.content.clone()).unwrap_or_default();
            Ok(format!("echo: {}", last))
        }
    }

    /// Stub model that always fails
    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _system: &str, _history: &HistoryContext) -> Result<String> {
            Err(Error::Provider("simulated outage".to_string()))
        }
    }

    /// Stub model that records the history it was handed
    struct RecordingModel {
        seen: Mutex<Vec<HistoryContext>>,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn complete(&self, _system: &str, history: &HistoryContext) -> Result<String> {
            self.seen.lock().unwrap().push(history.clone());
            Ok("ok".to_string())
        }
    }

    fn service(model: Arc<dyn ChatModel>) -> ChatService {
        ChatService::new(ConversationStore::in_memory().unwrap(), model)
    }

    #[tokio::test]
    async fn test_handle_chat_creates_session_and_persists_both_turns() {
        let service = service(Arc::new(EchoModel));

        let outcome = service.handle_chat("hello", None).await.unwrap();
        assert!(!outcome.session_id.is_empty());
        assert_eq!(outcome.reply, "echo: hello");

        let (_, messages) = service.get_conversation(&outcome.session_id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].content, "echo: hello");
    }

    #[tokio::test]
    async fn test_follow_up_includes_prior_turns_in_history() {
        let model = Arc::new(RecordingModel {
            seen: Mutex::new(Vec::new()),
        });
        let service = service(model.clone());

        let outcome = service.handle_chat("hello", None).await.unwrap();
        service
            .handle_chat("follow up", Some(outcome.session_id))
            .await
            .unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        // Second call sees: hello, ok, follow up
        assert_eq!(seen[1].len(), 3);
        assert_eq!(seen[1].turns[0].content, "hello");
        assert_eq!(seen[1].turns[2].content, "follow up");
    }

    #[tokio::test]
    async fn test_provider_failure_persists_fallback_reply() {
        let service = service(Arc::new(FailingModel));

        let outcome = service.handle_chat("hello", None).await.unwrap();
        assert_eq!(outcome.reply, FALLBACK_REPLY);

        let (_, messages) = service.get_conversation(&outcome.session_id).unwrap();
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].content, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_empty_session_id_is_treated_as_absent() {
        let service = service(Arc::new(EchoModel));
        let outcome = service.handle_chat("hello", Some(String::new())).await.unwrap();
        assert!(!outcome.session_id.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_requests_for_one_session() {
        let service = Arc::new(service(Arc::new(EchoModel)));

        let mut handles = Vec::new();
        for i in 0..50 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .handle_chat(&format!("message {}", i), Some("shared-id".to_string()))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let conversations = service.list_conversations().unwrap();
        assert_eq!(conversations.len(), 1);

        let (_, messages) = service.get_conversation("shared-id").unwrap();
        assert_eq!(messages.len(), 100);

        // Strictly increasing sequence with no gaps, alternating roles
        for (i, message) in messages.iter().enumerate() {
            assert_eq!(message.seq, i as i64 + 1);
            let expected = if i % 2 == 0 { "user" } else { "assistant" };
            assert_eq!(message.role, expected);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_distinct_sessions_proceed_independently() {
        let service = Arc::new(service(Arc::new(EchoModel)));

        let mut handles = Vec::new();
        for i in 0..10 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .handle_chat("hello", Some(format!("session-{}", i)))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(service.list_conversations().unwrap().len(), 10);
    }
}
