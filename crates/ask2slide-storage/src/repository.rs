//! Conversation persistence.
//!
//! Defines the `ConversationStore` contract used by the orchestrator and the
//! gateway, and its SQLite implementation. Expired conversations are treated
//! as absent by every operation, whether or not the purge cycle has already
//! removed them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use ask2slide_core::clock::{Clock, SystemClock};
use ask2slide_core::error::Ask2SlideError;
use ask2slide_core::types::{Conversation, ConversationSummary, Message, RetrievalContext, Role};

use crate::db::Database;

/// Persistent record of users' conversations and their message sequences.
///
/// Every mutating call refreshes `updated_at` and restarts the retention
/// window. Role ordering is not validated here.
pub trait ConversationStore: Send + Sync {
    /// Conversations owned by `user_id`, most recently updated first, without messages.
    fn list(&self, user_id: &str) -> Result<Vec<ConversationSummary>, Ask2SlideError>;

    /// A conversation with its full message sequence.
    fn get(&self, id: Uuid) -> Result<Conversation, Ask2SlideError>;

    /// Create an empty conversation.
    fn create(
        &self,
        user_id: &str,
        title: &str,
        knowledge_base_id: Option<&str>,
    ) -> Result<Conversation, Ask2SlideError>;

    /// Append messages in the given order and return the updated conversation.
    fn append_messages(
        &self,
        id: Uuid,
        messages: &[Message],
    ) -> Result<Conversation, Ask2SlideError>;

    fn delete(&self, id: Uuid) -> Result<(), Ask2SlideError>;

    /// Number of live (unexpired) conversations.
    fn count(&self) -> Result<u64, Ask2SlideError>;
}

/// SQLite-backed conversation store.
pub struct SqliteConversationStore {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl SqliteConversationStore {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            db,
            clock,
            retention,
        }
    }

    /// Store reading wall-clock time.
    pub fn with_system_clock(db: Arc<Database>, retention: Duration) -> Self {
        Self::new(db, Arc::new(SystemClock), retention)
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.retention
    }
}

impl ConversationStore for SqliteConversationStore {
    fn list(&self, user_id: &str) -> Result<Vec<ConversationSummary>, Ask2SlideError> {
        let now = self.clock.now();
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT c.id, c.user_id, c.title, c.knowledge_base_id, c.created_at, c.updated_at,
                            (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id)
                     FROM conversations c
                     WHERE c.user_id = ?1 AND c.expires_at > ?2
                     ORDER BY c.updated_at DESC, c.created_at DESC, c.id DESC",
                )
                .map_err(|e| Ask2SlideError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, now.timestamp_millis()], |row| {
                    Ok(row_to_summary(row))
                })
                .map_err(|e| Ask2SlideError::Storage(e.to_string()))?;

            let mut summaries = Vec::new();
            for row in rows {
                let summary = row.map_err(|e| Ask2SlideError::Storage(e.to_string()))??;
                summaries.push(summary);
            }
            Ok(summaries)
        })
    }

    fn get(&self, id: Uuid) -> Result<Conversation, Ask2SlideError> {
        let now = self.clock.now();
        self.db.with_conn(|conn| load_conversation(conn, id, now))
    }

    fn create(
        &self,
        user_id: &str,
        title: &str,
        knowledge_base_id: Option<&str>,
    ) -> Result<Conversation, Ask2SlideError> {
        let now = self.clock.now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            knowledge_base_id: knowledge_base_id.map(str::to_string),
            created_at: now,
            updated_at: now,
            expires_at: self.expiry_from(now),
            messages: Vec::new(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (id, user_id, title, knowledge_base_id, created_at, updated_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    conversation.id.to_string(),
                    conversation.user_id,
                    conversation.title,
                    conversation.knowledge_base_id,
                    conversation.created_at.timestamp_millis(),
                    conversation.updated_at.timestamp_millis(),
                    conversation.expires_at.timestamp_millis(),
                ],
            )
            .map_err(|e| Ask2SlideError::Storage(format!("Failed to create conversation: {}", e)))?;
            Ok(())
        })?;

        debug!(conversation_id = %conversation.id, user_id = %user_id, "Conversation created");
        Ok(conversation)
    }

    fn append_messages(
        &self,
        id: Uuid,
        messages: &[Message],
    ) -> Result<Conversation, Ask2SlideError> {
        let now = self.clock.now();
        let expires_at = self.expiry_from(now);

        let conversation = self.db.with_transaction(|tx| {
            let touched = tx
                .execute(
                    "UPDATE conversations SET updated_at = ?2, expires_at = ?3
                     WHERE id = ?1 AND expires_at > ?2",
                    rusqlite::params![
                        id.to_string(),
                        now.timestamp_millis(),
                        expires_at.timestamp_millis()
                    ],
                )
                .map_err(|e| Ask2SlideError::Storage(format!("Failed to touch conversation: {}", e)))?;
            if touched == 0 {
                return Err(Ask2SlideError::ConversationNotFound(id));
            }

            let next_seq: i64 = tx
                .query_row(
                    "SELECT COALESCE(MAX(seq) + 1, 0) FROM messages WHERE conversation_id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| row.get(0),
                )
                .map_err(|e| Ask2SlideError::Storage(e.to_string()))?;

            for (offset, message) in messages.iter().enumerate() {
                let (context_used, context_count) = match message.context {
                    Some(ctx) => (Some(ctx.used as i32), Some(ctx.count as i64)),
                    None => (None, None),
                };
                tx.execute(
                    "INSERT INTO messages (id, conversation_id, seq, role, content, created_at, context_used, context_count)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        message.id.to_string(),
                        id.to_string(),
                        next_seq + offset as i64,
                        message.role.as_str(),
                        message.content,
                        message.created_at.timestamp_millis(),
                        context_used,
                        context_count,
                    ],
                )
                .map_err(|e| Ask2SlideError::Storage(format!("Failed to append message: {}", e)))?;
            }

            load_conversation(tx, id, now)
        })?;

        debug!(
            conversation_id = %id,
            appended = messages.len(),
            total = conversation.messages.len(),
            "Messages appended"
        );
        Ok(conversation)
    }

    fn delete(&self, id: Uuid) -> Result<(), Ask2SlideError> {
        let now = self.clock.now();
        let deleted = self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM conversations WHERE id = ?1 AND expires_at > ?2",
                rusqlite::params![id.to_string(), now.timestamp_millis()],
            )
            .map_err(|e| Ask2SlideError::Storage(format!("Failed to delete conversation: {}", e)))
        })?;

        if deleted == 0 {
            return Err(Ask2SlideError::ConversationNotFound(id));
        }
        debug!(conversation_id = %id, "Conversation deleted");
        Ok(())
    }

    fn count(&self) -> Result<u64, Ask2SlideError> {
        let now = self.clock.now();
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM conversations WHERE expires_at > ?1",
                    rusqlite::params![now.timestamp_millis()],
                    |row| row.get(0),
                )
                .map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Load a live conversation and its messages in sequence order.
fn load_conversation(
    conn: &Connection,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Conversation, Ask2SlideError> {
    let header = conn
        .query_row(
            "SELECT id, user_id, title, knowledge_base_id, created_at, updated_at, expires_at
             FROM conversations WHERE id = ?1 AND expires_at > ?2",
            rusqlite::params![id.to_string(), now.timestamp_millis()],
            |row| Ok(row_to_conversation(row)),
        )
        .optional()
        .map_err(|e| Ask2SlideError::Storage(e.to_string()))?;

    let mut conversation = match header {
        Some(conversation) => conversation?,
        None => return Err(Ask2SlideError::ConversationNotFound(id)),
    };

    let mut stmt = conn
        .prepare(
            "SELECT id, role, content, created_at, context_used, context_count
             FROM messages WHERE conversation_id = ?1
             ORDER BY seq ASC",
        )
        .map_err(|e| Ask2SlideError::Storage(e.to_string()))?;

    let rows = stmt
        .query_map(rusqlite::params![id.to_string()], |row| {
            Ok(row_to_message(row))
        })
        .map_err(|e| Ask2SlideError::Storage(e.to_string()))?;

    for row in rows {
        let message = row.map_err(|e| Ask2SlideError::Storage(e.to_string()))??;
        conversation.messages.push(message);
    }

    Ok(conversation)
}

// ============================================================================
// Helper functions for row-to-entity conversion.
// ============================================================================

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn parse_uuid(value: &str) -> Result<Uuid, Ask2SlideError> {
    Uuid::parse_str(value).map_err(|e| Ask2SlideError::Storage(format!("Invalid UUID: {}", e)))
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, Ask2SlideError> {
    let id_str: String = row.get(0).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let user_id: String = row.get(1).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let title: String = row.get(2).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let knowledge_base_id: Option<String> =
        row.get(3).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(4).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let updated_at: i64 = row.get(5).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let expires_at: i64 = row.get(6).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;

    Ok(Conversation {
        id: parse_uuid(&id_str)?,
        user_id,
        title,
        knowledge_base_id,
        created_at: millis_to_datetime(created_at),
        updated_at: millis_to_datetime(updated_at),
        expires_at: millis_to_datetime(expires_at),
        messages: Vec::new(),
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> Result<ConversationSummary, Ask2SlideError> {
    let id_str: String = row.get(0).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let user_id: String = row.get(1).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let title: String = row.get(2).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let knowledge_base_id: Option<String> =
        row.get(3).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(4).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let updated_at: i64 = row.get(5).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let message_count: i64 = row.get(6).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;

    Ok(ConversationSummary {
        id: parse_uuid(&id_str)?,
        user_id,
        title,
        knowledge_base_id,
        created_at: millis_to_datetime(created_at),
        updated_at: millis_to_datetime(updated_at),
        message_count: message_count as u64,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, Ask2SlideError> {
    let id_str: String = row.get(0).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let role_str: String = row.get(1).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let content: String = row.get(2).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(3).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let context_used: Option<i32> =
        row.get(4).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;
    let context_count: Option<i64> =
        row.get(5).map_err(|e| Ask2SlideError::Storage(e.to_string()))?;

    let role: Role = role_str.parse().map_err(Ask2SlideError::Storage)?;
    let context = match (context_used, context_count) {
        (Some(used), Some(count)) => Some(RetrievalContext {
            used: used != 0,
            count: count.max(0) as usize,
        }),
        _ => None,
    };

    Ok(Message {
        id: parse_uuid(&id_str)?,
        role,
        content,
        created_at: millis_to_datetime(created_at),
        context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ask2slide_core::clock::ManualClock;

    fn make_store() -> (SqliteConversationStore, Arc<ManualClock>) {
        let db = Arc::new(Database::in_memory().unwrap());
        let clock = Arc::new(ManualClock::default());
        let store = SqliteConversationStore::new(db, clock.clone(), Duration::days(7));
        (store, clock)
    }

    #[test]
    fn test_create_then_get_is_empty() {
        let (store, _clock) = make_store();
        let created = store.create("alice", "Slides about Rust", None).unwrap();

        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.user_id, "alice");
        assert_eq!(fetched.title, "Slides about Rust");
        assert!(fetched.knowledge_base_id.is_none());
        assert!(fetched.messages.is_empty());
    }

    #[test]
    fn test_create_keeps_knowledge_base() {
        let (store, _clock) = make_store();
        let created = store.create("alice", "KB chat", Some("kb-42")).unwrap();
        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched.knowledge_base_id.as_deref(), Some("kb-42"));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (store, _clock) = make_store();
        let id = Uuid::new_v4();
        let err = store.get(id).unwrap_err();
        assert!(matches!(err, Ask2SlideError::ConversationNotFound(missing) if missing == id));
    }

    #[test]
    fn test_append_then_get_round_trip() {
        let (store, clock) = make_store();
        let conversation = store.create("alice", "t", None).unwrap();

        let user = Message::user("What is on slide 3?", clock.now());
        let reply = Message::assistant(
            "A chart of revenue.",
            RetrievalContext::from_count(2),
            clock.now(),
        );
        store
            .append_messages(conversation.id, &[user.clone(), reply.clone()])
            .unwrap();

        let fetched = store.get(conversation.id).unwrap();
        assert_eq!(fetched.messages.len(), 2);
        assert_eq!(fetched.messages[0].id, user.id);
        assert_eq!(fetched.messages[0].role, Role::User);
        assert_eq!(fetched.messages[0].content, "What is on slide 3?");
        assert!(fetched.messages[0].context.is_none());
        assert_eq!(fetched.messages[1].role, Role::Assistant);
        assert_eq!(fetched.messages[1].content, "A chart of revenue.");
        assert_eq!(
            fetched.messages[1].context,
            Some(RetrievalContext { used: true, count: 2 })
        );
    }

    #[test]
    fn test_append_preserves_order_across_calls() {
        let (store, clock) = make_store();
        let conversation = store.create("alice", "t", None).unwrap();

        for i in 0..5 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append_messages(
                    conversation.id,
                    &[Message::new(role, format!("msg {}", i), clock.now())],
                )
                .unwrap();
        }

        let contents: Vec<String> = store
            .get(conversation.id)
            .unwrap()
            .messages
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn test_store_accepts_any_role_order() {
        let (store, clock) = make_store();
        let conversation = store.create("alice", "t", None).unwrap();
        let updated = store
            .append_messages(
                conversation.id,
                &[
                    Message::new(Role::Assistant, "a", clock.now()),
                    Message::new(Role::Assistant, "b", clock.now()),
                    Message::new(Role::System, "c", clock.now()),
                ],
            )
            .unwrap();
        assert_eq!(updated.messages.len(), 3);
    }

    #[test]
    fn test_append_refreshes_timestamps() {
        let (store, clock) = make_store();
        let conversation = store.create("alice", "t", None).unwrap();

        clock.advance(Duration::hours(2));
        let updated = store
            .append_messages(conversation.id, &[Message::user("hi", clock.now())])
            .unwrap();

        assert_eq!(updated.created_at, conversation.created_at);
        assert_eq!(updated.updated_at, clock.now());
        assert_eq!(updated.expires_at, clock.now() + Duration::days(7));
    }

    #[test]
    fn test_append_to_missing_is_not_found() {
        let (store, clock) = make_store();
        let err = store
            .append_messages(Uuid::new_v4(), &[Message::user("hi", clock.now())])
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_orders_by_updated_desc() {
        let (store, clock) = make_store();
        let first = store.create("alice", "first", None).unwrap();
        clock.advance(Duration::seconds(1));
        let second = store.create("alice", "second", None).unwrap();
        clock.advance(Duration::seconds(1));
        store
            .append_messages(first.id, &[Message::user("bump", clock.now())])
            .unwrap();

        let list = store.list("alice").unwrap();
        let titles: Vec<&str> = list.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert_eq!(list[0].message_count, 1);
        assert_eq!(list[1].message_count, 0);
        assert_eq!(list[1].id, second.id);
    }

    #[test]
    fn test_list_is_scoped_to_user() {
        let (store, _clock) = make_store();
        store.create("alice", "a", None).unwrap();
        store.create("bob", "b", None).unwrap();

        let list = store.list("alice").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].user_id, "alice");
        assert!(store.list("carol").unwrap().is_empty());
    }

    #[test]
    fn test_list_is_idempotent() {
        let (store, clock) = make_store();
        for i in 0..3 {
            store.create("alice", &format!("c{}", i), None).unwrap();
            clock.advance(Duration::milliseconds(10));
        }

        let first = store.list("alice").unwrap();
        let second = store.list("alice").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_delete() {
        let (store, _clock) = make_store();
        let conversation = store.create("alice", "t", None).unwrap();

        store.delete(conversation.id).unwrap();
        assert!(store.get(conversation.id).unwrap_err().is_not_found());
        assert!(store.delete(conversation.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_expired_conversation_is_hidden() {
        let (store, clock) = make_store();
        let conversation = store.create("alice", "old", None).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        clock.advance(Duration::days(7) + Duration::seconds(1));

        assert!(store.get(conversation.id).unwrap_err().is_not_found());
        assert!(store.list("alice").unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 0);
        assert!(store
            .append_messages(conversation.id, &[Message::user("late", clock.now())])
            .unwrap_err()
            .is_not_found());
        assert!(store.delete(conversation.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_write_restarts_retention_window() {
        let (store, clock) = make_store();
        let conversation = store.create("alice", "active", None).unwrap();

        clock.advance(Duration::days(6));
        store
            .append_messages(conversation.id, &[Message::user("still here", clock.now())])
            .unwrap();

        clock.advance(Duration::days(6));
        assert!(store.get(conversation.id).is_ok());
    }
}
