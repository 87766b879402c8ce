//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use ask2slide_chat::MessageOrchestrator;
use ask2slide_core::config::Ask2SlideConfig;
use ask2slide_storage::ConversationStore;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. Nothing here
/// is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Ask2SlideConfig>,
    pub store: Arc<dyn ConversationStore>,
    pub orchestrator: Arc<MessageOrchestrator>,
    /// Bearer token required on protected routes; `None` disables auth.
    pub api_token: Option<String>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Ask2SlideConfig,
        store: Arc<dyn ConversationStore>,
        orchestrator: MessageOrchestrator,
    ) -> Self {
        let api_token = config
            .server
            .api_token
            .clone()
            .filter(|token| !token.trim().is_empty());
        Self {
            config: Arc::new(config),
            store,
            orchestrator: Arc::new(orchestrator),
            api_token,
            start_time: Instant::now(),
        }
    }

    /// User id applied when a request names none.
    pub fn default_user_id(&self) -> &str {
        &self.config.server.default_user_id
    }
}
