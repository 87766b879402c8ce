//! Database schema migrations.
//!
//! Applies the initial schema: the conversations and messages tables plus
//! the schema_migrations bookkeeping table.

use rusqlite::Connection;
use tracing::info;

use ask2slide_core::error::Ask2SlideError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), Ask2SlideError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| Ask2SlideError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| {
            Ask2SlideError::Storage(format!("Failed to query migration version: {}", e))
        })?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: conversations");
    }

    Ok(())
}

/// Version 1: conversations and their ordered messages.
///
/// Timestamps are Unix milliseconds.
fn apply_v1(conn: &Connection) -> Result<(), Ask2SlideError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS conversations (
            id                  TEXT PRIMARY KEY NOT NULL,
            user_id             TEXT NOT NULL,
            title               TEXT NOT NULL,
            knowledge_base_id   TEXT,
            created_at          INTEGER NOT NULL,
            updated_at          INTEGER NOT NULL,
            expires_at          INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_user_updated
            ON conversations (user_id, updated_at DESC);

        CREATE INDEX IF NOT EXISTS idx_conversations_expires_at
            ON conversations (expires_at);

        CREATE TABLE IF NOT EXISTS messages (
            id                  TEXT PRIMARY KEY NOT NULL,
            conversation_id     TEXT NOT NULL,
            seq                 INTEGER NOT NULL,
            role                TEXT NOT NULL
                                CHECK (role IN ('system', 'user', 'assistant')),
            content             TEXT NOT NULL,
            created_at          INTEGER NOT NULL,
            context_used        INTEGER,
            context_count       INTEGER,
            UNIQUE (conversation_id, seq),
            FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
        );

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'conversations');
        ",
    )
    .map_err(|e| Ask2SlideError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
