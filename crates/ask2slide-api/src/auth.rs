//! Optional bearer-token authentication.
//!
//! When `server.api_token` is configured, protected routes require an
//! `Authorization: Bearer <token>` header. Without a token every request
//! passes through.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::Rng;

use crate::error::ApiError;
use crate::state::AppState;

/// Generate a random 32-character hex token suitable for `server.api_token`.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

/// Middleware that validates the bearer token if one is configured.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(req).await;
    };

    let header = match req.headers().get("authorization") {
        Some(value) => value,
        None => {
            return ApiError::Unauthorized("Missing Authorization header".into()).into_response()
        }
    };

    let Ok(value) = header.to_str() else {
        return ApiError::Unauthorized("Invalid Authorization header encoding".into())
            .into_response();
    };

    match value.strip_prefix("Bearer ") {
        Some(token) if token == expected => next.run(req).await,
        _ => ApiError::Unauthorized("Invalid bearer token".into()).into_response(),
    }
}
