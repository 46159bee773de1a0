//! Conversation and message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// String form as stored in the database and sent over the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted conversation thread, identified by an opaque session id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Database row id
    pub id: i64,
    /// Opaque session identifier (externally supplied or generated)
    pub session_id: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One immutable turn in a conversation
///
/// The role is kept as a raw string on read so that malformed stored data
/// reaches the context assembler's fallback policy instead of failing the
/// row mapping. Writes only ever go through [`Role`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Database row id
    pub id: i64,
    /// Owning conversation row id
    pub conversation_id: i64,
    /// Position within the conversation, strictly increasing from 1
    pub seq: i64,
    /// Author role as stored
    pub role: String,
    /// Message text (may be empty)
    pub content: String,
    /// Insertion timestamp
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    /// Check whether the content carries anything beyond whitespace
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}
