//! Retention purge for expired conversations.
//!
//! Reads already treat expired conversations as absent; the purge cycle
//! reclaims their rows so the database does not grow without bound.

use tracing::info;

use ask2slide_core::clock::Clock;
use ask2slide_core::error::Ask2SlideError;

use crate::db::Database;

/// Result of a purge operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeResult {
    /// Conversations removed because their retention window had passed.
    pub conversations_deleted: usize,
    /// Messages removed along with those conversations.
    pub messages_deleted: usize,
}

/// Deletes conversations whose `expires_at` is at or before the clock's now.
pub struct RetentionManager;

impl RetentionManager {
    /// Run one purge cycle.
    pub fn run_purge(db: &Database, clock: &dyn Clock) -> Result<PurgeResult, Ask2SlideError> {
        let now = clock.now().timestamp_millis();

        let result = db.with_transaction(|tx| {
            let messages_deleted = tx
                .execute(
                    "DELETE FROM messages WHERE conversation_id IN
                        (SELECT id FROM conversations WHERE expires_at <= ?1)",
                    rusqlite::params![now],
                )
                .map_err(|e| Ask2SlideError::Storage(format!("Purge messages failed: {}", e)))?;

            let conversations_deleted = tx
                .execute(
                    "DELETE FROM conversations WHERE expires_at <= ?1",
                    rusqlite::params![now],
                )
                .map_err(|e| {
                    Ask2SlideError::Storage(format!("Purge conversations failed: {}", e))
                })?;

            Ok(PurgeResult {
                conversations_deleted,
                messages_deleted,
            })
        })?;

        if result.conversations_deleted > 0 {
            info!(
                conversations_deleted = result.conversations_deleted,
                messages_deleted = result.messages_deleted,
                "Purge cycle completed"
            );
        }

        Ok(result)
    }
}
