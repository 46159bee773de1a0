//! Conversation persistence using SQLite

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};

use crate::session::{Conversation, Role, StoredMessage};
use crate::{Error, Result};

/// SQLite-based conversation store
///
/// Conversations and messages live in separate tables so that messages keep
/// their own ids and sequence markers, and deleting a conversation cascades
/// to its messages.
pub struct ConversationStore {
    conn: Connection,
}

impl ConversationStore {
    /// Create a new store with the given database path
    pub fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        // Cascade deletes require the pragma on every connection
        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS conversations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id  TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL
                    REFERENCES conversations(id) ON DELETE CASCADE,
                seq             INTEGER NOT NULL,
                role            TEXT NOT NULL,
                content         TEXT NOT NULL,
                timestamp       TEXT NOT NULL,
                UNIQUE(conversation_id, seq)
            )",
            [],
        )?;

        Ok(())
    }

    /// Resolve a session id to its conversation, creating one on demand
    ///
    /// An absent id gets a freshly generated uuid. A supplied id that matches
    /// nothing creates a conversation carrying that id; unknown-but-supplied
    /// ids are not rejected. Returns the conversation and whether it was
    /// created by this call.
    pub fn resolve_or_create(&self, session_id: Option<&str>) -> Result<(Conversation, bool)> {
        match session_id {
            Some(id) => {
                if let Some(conversation) = self.find(id)? {
                    return Ok((conversation, false));
                }
                Ok((self.create(id)?, true))
            }
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                Ok((self.create(&id)?, true))
            }
        }
    }

    /// Look up a conversation by session id
    fn find(&self, session_id: &str) -> Result<Option<Conversation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, created_at FROM conversations WHERE session_id = ?1",
        )?;

        let result = stmt.query_row(params![session_id], row_to_conversation);

        match result {
            Ok(conversation) => Ok(Some(conversation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::from(e)),
        }
    }

    /// Insert a new conversation row
    fn create(&self, session_id: &str) -> Result<Conversation> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO conversations (session_id, created_at) VALUES (?1, ?2)",
            params![session_id, created_at.to_rfc3339()],
        )?;
        Ok(Conversation {
            id: self.conn.last_insert_rowid(),
            session_id: session_id.to_string(),
            created_at,
        })
    }

    /// Append a message with the next sequence marker
    pub fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<StoredMessage> {
        let conversation = self
            .find(session_id)?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        let seq: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE conversation_id = ?1",
            params![conversation.id],
            |row| row.get(0),
        )?;

        let timestamp = Utc::now();
        self.conn.execute(
            "INSERT INTO messages (conversation_id, seq, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                conversation.id,
                seq,
                role.as_str(),
                content,
                timestamp.to_rfc3339(),
            ],
        )?;

        Ok(StoredMessage {
            id: self.conn.last_insert_rowid(),
            conversation_id: conversation.id,
            seq,
            role: role.as_str().to_string(),
            content: content.to_string(),
            timestamp,
        })
    }

    /// List all messages of a conversation in insertion order
    pub fn list_messages(&self, session_id: &str) -> Result<Vec<StoredMessage>> {
        let conversation = self
            .find(session_id)?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        self.messages_for(conversation.id)
    }

    fn messages_for(&self, conversation_id: i64) -> Result<Vec<StoredMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, seq, role, content, timestamp FROM messages
             WHERE conversation_id = ?1 ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id], row_to_message)?;

        let mut messages = Vec::new();
        for message in rows {
            messages.push(message?);
        }
        Ok(messages)
    }

    /// Get a conversation with its messages
    pub fn get_conversation(
        &self,
        session_id: &str,
    ) -> Result<(Conversation, Vec<StoredMessage>)> {
        let conversation = self
            .find(session_id)?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let messages = self.messages_for(conversation.id)?;
        Ok((conversation, messages))
    }

    /// List all conversations with their messages
    pub fn list_conversations(&self) -> Result<Vec<(Conversation, Vec<StoredMessage>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, session_id, created_at FROM conversations ORDER BY id ASC")?;

        let rows = stmt.query_map([], row_to_conversation)?;

        let mut conversations = Vec::new();
        for conversation in rows {
            conversations.push(conversation?);
        }

        let mut result = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let messages = self.messages_for(conversation.id)?;
            result.push((conversation, messages));
        }
        Ok(result)
    }

    /// Delete a conversation and all its messages
    pub fn delete_conversation(&self, session_id: &str) -> Result<()> {
        let conversation = self
            .find(session_id)?
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        self.conn.execute(
            "DELETE FROM conversations WHERE id = ?1",
            params![conversation.id],
        )?;
        Ok(())
    }
}

fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let created_at_str: String = row.get(2)?;
    let created_at = parse_timestamp(&created_at_str)?;

    Ok(Conversation {
        id: row.get(0)?,
        session_id: row.get(1)?,
        created_at,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    let timestamp_str: String = row.get(5)?;
    let timestamp = parse_timestamp(&timestamp_str)?;

    Ok(StoredMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        seq: row.get(2)?,
        role: row.get(3)?,
        content: row.get(4)?,
        timestamp,
    })
}

fn parse_timestamp(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| rusqlite::Error::InvalidQuery)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_creation() {
        let store = ConversationStore::in_memory().unwrap();
        assert!(store.list_conversations().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_or_create_generates_id() {
        let store = ConversationStore::in_memory().unwrap();
        let (conversation, is_new) = store.resolve_or_create(None).unwrap();
        assert!(is_new);
        assert!(!conversation.session_id.is_empty());
    }

    #[test]
    fn test_resolve_or_create_is_idempotent() {
        let store = ConversationStore::in_memory().unwrap();
        let (first, created) = store.resolve_or_create(Some("abc-123")).unwrap();
        assert!(created);
        let (second, created_again) = store.resolve_or_create(Some("abc-123")).unwrap();
        assert!(!created_again);
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_conversations().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_supplied_id_creates_on_demand() {
        let store = ConversationStore::in_memory().unwrap();
        let (conversation, is_new) = store.resolve_or_create(Some("client-chosen")).unwrap();
        assert!(is_new);
        assert_eq!(conversation.session_id, "client-chosen");
    }

    #[test]
    fn test_append_keeps_strict_sequence_order() {
        let store = ConversationStore::in_memory().unwrap();
        store.resolve_or_create(Some("s1")).unwrap();

        store.append_message("s1", Role::User, "hello").unwrap();
        store.append_message("s1", Role::Assistant, "hi there").unwrap();
        store.append_message("s1", Role::User, "follow up").unwrap();

        let messages = store.list_messages("s1").unwrap();
        let seqs: Vec<i64> = messages.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].role, "assistant");
    }

    #[test]
    fn test_append_to_unknown_session_fails() {
        let store = ConversationStore::in_memory().unwrap();
        let err = store.append_message("missing", Role::User, "hello");
        assert!(matches!(err, Err(Error::SessionNotFound(_))));
    }

    #[test]
    fn test_list_messages_unknown_session_fails() {
        let store = ConversationStore::in_memory().unwrap();
        assert!(matches!(
            store.list_messages("missing"),
            Err(Error::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_delete_cascades_to_messages() {
        let store = ConversationStore::in_memory().unwrap();
        store.resolve_or_create(Some("s1")).unwrap();
        store.append_message("s1", Role::User, "hello").unwrap();
        store.append_message("s1", Role::Assistant, "hi").unwrap();

        store.delete_conversation("s1").unwrap();

        assert!(matches!(
            store.list_messages("s1"),
            Err(Error::SessionNotFound(_))
        ));
        // Re-creating the id starts from an empty history
        store.resolve_or_create(Some("s1")).unwrap();
        assert!(store.list_messages("s1").unwrap().is_empty());
    }

    #[test]
    fn test_delete_unknown_session_fails() {
        let store = ConversationStore::in_memory().unwrap();
        assert!(matches!(
            store.delete_conversation("missing"),
            Err(Error::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_sequences_are_independent_per_conversation() {
        let store = ConversationStore::in_memory().unwrap();
        store.resolve_or_create(Some("s1")).unwrap();
        store.resolve_or_create(Some("s2")).unwrap();

        store.append_message("s1", Role::User, "a").unwrap();
        store.append_message("s2", Role::User, "b").unwrap();
        store.append_message("s1", Role::Assistant, "c").unwrap();

        assert_eq!(store.list_messages("s1").unwrap().len(), 2);
        let s2 = store.list_messages("s2").unwrap();
        assert_eq!(s2.len(), 1);
        assert_eq!(s2[0].seq, 1);
    }

    #[test]
    fn test_get_conversation_returns_messages() {
        let store = ConversationStore::in_memory().unwrap();
        store.resolve_or_create(Some("s1")).unwrap();
        store.append_message("s1", Role::User, "hello").unwrap();

        let (conversation, messages) = store.get_conversation("s1").unwrap();
        assert_eq!(conversation.session_id, "s1");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");
        let path = path.to_str().unwrap();

        {
            let store = ConversationStore::new(path).unwrap();
            store.resolve_or_create(Some("s1")).unwrap();
            store.append_message("s1", Role::User, "hello").unwrap();
        }

        let store = ConversationStore::new(path).unwrap();
        let messages = store.list_messages("s1").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello");
    }
}
