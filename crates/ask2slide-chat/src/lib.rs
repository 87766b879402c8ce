//! Message handling for Ask2Slide.
//!
//! Provides the retrieval and completion clients that talk to the external
//! services, conversation title generation, and the orchestrator that ties a
//! user message to a persisted assistant reply.

pub mod completion;
pub mod error;
pub mod orchestrator;
pub mod retrieval;
pub mod title;

pub use completion::{
    Completion, CompletionBackend, CompletionClient, FallbackReason, COMPLETION_FAILED_FALLBACK,
    INITIALIZING_PLACEHOLDER,
};
pub use error::ChatError;
pub use orchestrator::{MessageOrchestrator, MessageOutcome, MessageRequest};
pub use retrieval::{RetrievalClient, Retriever};
pub use title::conversation_title;
