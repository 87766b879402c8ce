//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/path/body values via axum extractors, calls
//! the conversation store or the message orchestrator, and returns JSON.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use ask2slide_chat::title::DEFAULT_TITLE;
use ask2slide_chat::MessageRequest;
use ask2slide_core::types::{Conversation, ConversationSummary, RetrievalContext};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub user_id: Option<String>,
}

/// Body for POST /conversation. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
    pub user_id: Option<String>,
    pub knowledge_base_id: Option<String>,
}

/// Body for POST /message.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    /// Kept as a string so a malformed id is a 400 with a JSON body.
    pub conversation_id: Option<String>,
    pub message: String,
    pub user_id: Option<String>,
    pub knowledge_base_id: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub conversation_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub conversation_id: Uuid,
    /// The assistant reply.
    pub message: String,
    pub updated_at: DateTime<Utc>,
    pub context: RetrievalContext,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_conversation_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid conversation id '{}'", raw)))
}

/// Non-blank value or the fallback.
fn non_blank(value: Option<String>, fallback: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health - liveness plus a live conversation count.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, conversation_count) = match state.store.count() {
        Ok(count) => ("healthy", count),
        Err(e) => {
            warn!(error = %e, "Health check could not count conversations");
            ("degraded", 0)
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        conversation_count,
    })
}

/// GET /conversations?user_id= - summaries, most recently updated first.
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let user_id = non_blank(params.user_id, state.default_user_id());
    let conversations = state.store.list(&user_id)?;
    Ok(Json(ConversationsResponse { conversations }))
}

/// GET /conversation/{id} - a conversation with all of its messages.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    let id = parse_conversation_id(&id)?;
    Ok(Json(state.store.get(id)?))
}

/// POST /conversation - start an empty conversation.
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(body): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let user_id = non_blank(body.user_id, state.default_user_id());
    let title = non_blank(body.title, DEFAULT_TITLE);
    let knowledge_base_id = body
        .knowledge_base_id
        .map(|kb| kb.trim().to_string())
        .filter(|kb| !kb.is_empty());

    let conversation = state
        .store
        .create(&user_id, &title, knowledge_base_id.as_deref())?;

    info!(conversation_id = %conversation.id, user_id = %user_id, "Conversation created via API");
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// POST /message - send a user message and receive the assistant reply.
pub async fn post_message(
    State(state): State<AppState>,
    Json(body): Json<PostMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conversation_id = match body.conversation_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_conversation_id(raw)?),
        _ => None,
    };

    let request = MessageRequest {
        conversation_id,
        text: body.message,
        user_id: non_blank(body.user_id, state.default_user_id()),
        knowledge_base_id: body
            .knowledge_base_id
            .map(|kb| kb.trim().to_string())
            .filter(|kb| !kb.is_empty()),
    };

    let outcome = state.orchestrator.handle_message(request).await?;

    Ok(Json(MessageResponse {
        conversation_id: outcome.conversation_id,
        message: outcome.assistant_text,
        updated_at: outcome.updated_at,
        context: outcome.context,
    }))
}

/// DELETE /conversation/{id}
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_conversation_id(&id)?;
    state.store.delete(id)?;
    info!(conversation_id = %id, "Conversation deleted via API");
    Ok(Json(DeleteResponse { success: true }))
}
