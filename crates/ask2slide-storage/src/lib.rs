//! Ask2Slide storage crate - SQLite persistence and conversation retention.
//!
//! Provides a WAL-mode SQLite database with migrations, the conversation
//! store used by the gateway, and the purge cycle that deletes conversations
//! past their retention window.

pub mod db;
pub mod migrations;
pub mod repository;
pub mod retention;

pub use db::Database;
pub use repository::{ConversationStore, SqliteConversationStore};
pub use retention::{PurgeResult, RetentionManager};
