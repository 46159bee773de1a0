//! sc-core: Smart Chat Core Library
//!
//! Conversation persistence, chat-history assembly, and the model
//! provider client behind the Smart Chat HTTP API.

pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod service;
pub mod session;

pub use config::{ApiConfig, Config, LlmConfig, ModelProvider, StorageConfig};
pub use error::{Error, Result};
pub use history::{ContextAssembler, HistoryContext, Turn};
pub use llm::{ChatModel, ModelClient};
pub use service::{ChatOutcome, ChatService, FALLBACK_REPLY, SYSTEM_PROMPT};
pub use session::{Conversation, ConversationStore, Role, StoredMessage};
