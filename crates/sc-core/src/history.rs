//! Chat-history reconstruction
//!
//! Rebuilds the in-memory context window handed to the model provider from
//! persisted messages. The history is reconstructed fresh from the store on
//! every call; there is no cached mutable history object shared between
//! requests.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::session::{Role, StoredMessage};

/// One role-tagged turn of model input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered turn sequence handed to the model provider for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryContext {
    pub turns: Vec<Turn>,
}

impl HistoryContext {
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Builds a [`HistoryContext`] from persisted messages
///
/// Messages with empty or whitespace-only content are skipped. Roles outside
/// {user, assistant} fall back to assistant, with a warning; the store never
/// writes such rows, so hitting the fallback means the data was tampered
/// with or migrated badly.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    /// Keep only the most recent N turns (None = full history)
    max_turns: Option<usize>,
}

impl ContextAssembler {
    /// Assembler passing the full history on every call
    pub fn new() -> Self {
        Self { max_turns: None }
    }

    /// Assembler bounded to the most recent `max_turns` turns
    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            max_turns: Some(max_turns),
        }
    }

    /// Reconstruct the context window from messages in insertion order
    pub fn build(&self, messages: &[StoredMessage]) -> HistoryContext {
        let mut turns: Vec<Turn> = messages
            .iter()
            .filter(|m| !m.is_blank())
            .map(|m| Turn {
                role: Self::map_role(m),
                content: m.content.clone(),
            })
            .collect();

        if let Some(max) = self.max_turns {
            if turns.len() > max {
                turns.drain(0..turns.len() - max);
            }
        }

        HistoryContext { turns }
    }

    fn map_role(message: &StoredMessage) -> Role {
        match message.role.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => {
                warn!(
                    message_id = message.id,
                    role = other,
                    "unrecognized stored role, treating as assistant"
                );
                Role::Assistant
            }
        }
    }
}
