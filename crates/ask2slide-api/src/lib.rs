//! Ask2Slide API crate - axum HTTP gateway.
//!
//! Exposes conversation management and message handling as a REST API,
//! with health reporting, optional bearer-token auth and rate limiting.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
