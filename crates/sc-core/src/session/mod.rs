//! Conversation persistence module
//!
//! Maps opaque session identifiers to ordered, persisted message history.

mod store;
mod types;

pub use store::ConversationStore;
pub use types::{Conversation, Role, StoredMessage};
