//! Error types for message handling.

use ask2slide_core::error::Ask2SlideError;

/// Errors from the message orchestrator.
///
/// Upstream service failures never appear here; the clients absorb them.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("conversation not found: {0}")]
    ConversationNotFound(uuid::Uuid),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<Ask2SlideError> for ChatError {
    fn from(err: Ask2SlideError) -> Self {
        match err {
            Ask2SlideError::ConversationNotFound(id) => ChatError::ConversationNotFound(id),
            other => ChatError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(8000).to_string(),
            "message exceeds maximum length of 8000 characters"
        );
        assert_eq!(
            ChatError::Storage("disk full".to_string()).to_string(),
            "storage error: disk full"
        );
    }

    #[test]
    fn test_not_found_stays_distinct() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let chat_err: ChatError = Ask2SlideError::ConversationNotFound(id).into();
        assert!(matches!(chat_err, ChatError::ConversationNotFound(missing) if missing == id));
        assert_eq!(
            chat_err.to_string(),
            "conversation not found: 550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn test_other_errors_become_storage() {
        let chat_err: ChatError = Ask2SlideError::Storage("connection lost".to_string()).into();
        assert!(matches!(chat_err, ChatError::Storage(_)));
        assert!(chat_err.to_string().contains("connection lost"));
    }
}
