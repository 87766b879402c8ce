use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for the Ask2Slide gateway.
///
/// Subsystem crates define their own error types and convert from this one
/// so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Ask2SlideError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(Uuid),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Ask2SlideError {
    /// True when the error means the referenced conversation does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Ask2SlideError::ConversationNotFound(_))
    }
}

impl From<toml::de::Error> for Ask2SlideError {
    fn from(err: toml::de::Error) -> Self {
        Ask2SlideError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Ask2SlideError {
    fn from(err: toml::ser::Error) -> Self {
        Ask2SlideError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Ask2SlideError {
    fn from(err: serde_json::Error) -> Self {
        Ask2SlideError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Ask2Slide operations.
pub type Result<T> = std::result::Result<T, Ask2SlideError>;
