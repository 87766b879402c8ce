//! Client for the OpenAI-compatible completion endpoint.
//!
//! Each call probes `/health` first. A model that is still loading, or a
//! request that fails for any reason, yields a fixed fallback reply instead
//! of an error, tagged with the reason so callers can log it.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ask2slide_core::config::CompletionConfig;
use ask2slide_core::error::Ask2SlideError;
use ask2slide_core::types::ChatTurn;

/// Reply used while the model reports it is not ready.
pub const INITIALIZING_PLACEHOLDER: &str =
    "The model is still loading. Please try again in a moment.";

/// Reply used when the completion request itself fails.
pub const COMPLETION_FAILED_FALLBACK: &str = "I'm sorry, I couldn't generate a proper response.";

/// Why a fallback reply was substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The readiness probe did not report the ready status.
    NotReady { status: String },
    /// The completion request failed or returned nothing usable.
    RequestFailed { detail: String },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NotReady { status } => write!(f, "model not ready ({})", status),
            FallbackReason::RequestFailed { detail } => {
                write!(f, "completion request failed: {}", detail)
            }
        }
    }
}

/// Outcome of one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Ready(String),
    Fallback { text: String, reason: FallbackReason },
}

impl Completion {
    fn not_ready(status: impl Into<String>) -> Self {
        Completion::Fallback {
            text: INITIALIZING_PLACEHOLDER.to_string(),
            reason: FallbackReason::NotReady {
                status: status.into(),
            },
        }
    }

    fn failed(detail: impl Into<String>) -> Self {
        Completion::Fallback {
            text: COMPLETION_FAILED_FALLBACK.to_string(),
            reason: FallbackReason::RequestFailed {
                detail: detail.into(),
            },
        }
    }

    /// The assistant text, whether generated or substituted.
    pub fn text(&self) -> &str {
        match self {
            Completion::Ready(text) => text,
            Completion::Fallback { text, .. } => text,
        }
    }
}

/// A language model that answers a prompt history.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, turns: &[ChatTurn]) -> Completion;
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP completion client.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    timeout: Duration,
    health_timeout: Duration,
    ready_status: String,
}

impl CompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, Ask2SlideError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            Ask2SlideError::Config(format!("Failed to build completion client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            timeout: Duration::from_secs(config.timeout_secs),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
            ready_status: config.ready_status.clone(),
        })
    }

    /// `Ok(())` when the service reports the ready status, otherwise the
    /// status it did report.
    async fn check_ready(&self) -> Result<(), String> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| format!("unreachable: {}", e))?;

        if !resp.status().is_success() {
            return Err(format!("http {}", resp.status().as_u16()));
        }

        let health: HealthResponse = resp
            .json()
            .await
            .map_err(|e| format!("unreadable health body: {}", e))?;

        if health.status == self.ready_status {
            Ok(())
        } else {
            Err(health.status)
        }
    }

    async fn request_completion(&self, turns: &[ChatTurn]) -> Result<String, String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: turns,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        };

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("http {}: {}", status, text));
        }

        let data: ChatCompletionResponse = resp.json().await.map_err(|e| e.to_string())?;
        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| "response contained no choices".to_string())?;

        if content.trim().is_empty() {
            return Err("response content was empty".to_string());
        }
        Ok(content)
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Completion {
        if let Err(status) = self.check_ready().await {
            return Completion::not_ready(status);
        }

        match self.request_completion(turns).await {
            Ok(text) => {
                debug!(turns = turns.len(), chars = text.len(), "Completion received");
                Completion::Ready(text)
            }
            Err(detail) => Completion::failed(detail),
        }
    }
}
