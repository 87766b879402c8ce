//! Message orchestrator: turns one user message into a persisted exchange.
//!
//! Resolves or creates the conversation, stores the user message, gathers
//! optional document context, asks the completion backend for a reply and
//! stores that reply.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use ask2slide_core::clock::{Clock, SystemClock};
use ask2slide_core::config::ChatConfig;
use ask2slide_core::types::{
    ChatTurn, Conversation, Message, RetrievalContext, RetrievedSnippet, Role,
};
use ask2slide_storage::ConversationStore;

use crate::completion::{Completion, CompletionBackend};
use crate::error::ChatError;
use crate::retrieval::Retriever;
use crate::title::conversation_title;

/// A new user message addressed to an existing or new conversation.
#[derive(Debug, Clone)]
pub struct MessageRequest {
    /// Existing conversation; `None` starts a new one.
    pub conversation_id: Option<Uuid>,
    pub text: String,
    pub user_id: String,
    /// Knowledge base for a new conversation. Ignored for existing ones.
    pub knowledge_base_id: Option<String>,
}

/// The stored assistant reply and where it went.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageOutcome {
    pub conversation_id: Uuid,
    pub assistant_text: String,
    pub updated_at: DateTime<Utc>,
    pub context: RetrievalContext,
}

/// Coordinates the conversation store with the retrieval and completion services.
pub struct MessageOrchestrator {
    store: Arc<dyn ConversationStore>,
    retriever: Arc<dyn Retriever>,
    completion: Arc<dyn CompletionBackend>,
    clock: Arc<dyn Clock>,
    config: ChatConfig,
    retrieval_top_k: usize,
}

impl MessageOrchestrator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        retriever: Arc<dyn Retriever>,
        completion: Arc<dyn CompletionBackend>,
        config: ChatConfig,
        retrieval_top_k: usize,
    ) -> Self {
        Self {
            store,
            retriever,
            completion,
            clock: Arc::new(SystemClock),
            config,
            retrieval_top_k,
        }
    }

    /// Stamp messages from `clock`. Pass the same clock the store uses so
    /// message times never run ahead of the conversation's `updated_at`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Handle one user message end to end.
    ///
    /// The user message is stored before any upstream call, so a failure
    /// after that point leaves it in place without a reply.
    pub async fn handle_message(
        &self,
        request: MessageRequest,
    ) -> Result<MessageOutcome, ChatError> {
        self.validate(&request.text)?;

        let conversation = self.resolve_conversation(&request)?;
        let conversation = self.store.append_messages(
            conversation.id,
            &[Message::user(request.text.as_str(), self.clock.now())],
        )?;

        let mut turns = conversation.history();
        let snippets = self.gather_context(&conversation, &request.text).await;
        if !snippets.is_empty() {
            turns.insert(0, context_turn(&snippets));
        }
        let context = RetrievalContext::from_count(snippets.len());

        let completion = self.completion.complete(&turns).await;
        if let Completion::Fallback { reason, .. } = &completion {
            warn!(conversation_id = %conversation.id, reason = %reason, "Using fallback reply");
        }

        let assistant_text = completion.text().to_string();
        let stored = self.store.append_messages(
            conversation.id,
            &[Message::assistant(
                assistant_text.as_str(),
                context,
                self.clock.now(),
            )],
        )?;

        info!(
            conversation_id = %stored.id,
            messages = stored.messages.len(),
            context_used = context.used,
            context_count = context.count,
            "Message handled"
        );

        Ok(MessageOutcome {
            conversation_id: stored.id,
            assistant_text,
            updated_at: stored.updated_at,
            context,
        })
    }

    fn validate(&self, text: &str) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.config.max_message_chars {
            return Err(ChatError::MessageTooLong(self.config.max_message_chars));
        }
        Ok(())
    }

    fn resolve_conversation(&self, request: &MessageRequest) -> Result<Conversation, ChatError> {
        match request.conversation_id {
            Some(id) => Ok(self.store.get(id)?),
            None => {
                let title = conversation_title(&request.text, self.config.title_max_chars);
                let conversation = self.store.create(
                    &request.user_id,
                    &title,
                    request.knowledge_base_id.as_deref(),
                )?;
                info!(
                    conversation_id = %conversation.id,
                    user_id = %request.user_id,
                    "Started conversation"
                );
                Ok(conversation)
            }
        }
    }

    async fn gather_context(&self, conversation: &Conversation, text: &str) -> Vec<RetrievedSnippet> {
        match conversation.knowledge_base_id.as_deref() {
            Some(kb_id) => self.retriever.search(text, kb_id, self.retrieval_top_k).await,
            None => Vec::new(),
        }
    }
}

/// System turn listing retrieved snippets by rank.
fn context_turn(snippets: &[RetrievedSnippet]) -> ChatTurn {
    let mut content = String::from(
        "Answer the user's question using the following document excerpts where relevant.\n",
    );
    for snippet in snippets {
        content.push_str(&format!("\n[{}] {}", snippet.rank, snippet.text));
        if let Some(source) = &snippet.source {
            content.push_str(&format!(" (source: {})", source));
        }
    }
    ChatTurn::new(Role::System, content)
}
