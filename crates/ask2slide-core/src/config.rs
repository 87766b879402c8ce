use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Ask2SlideError, Result};

/// Top-level configuration for the Ask2Slide gateway.
///
/// Loaded from `~/.ask2slide/config.toml` by default. Each section corresponds
/// to one component or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ask2SlideConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Ask2SlideConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Ask2SlideConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| Ask2SlideError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.ask2slide/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Caller identity used when a request does not name a user.
    pub default_user_id: String,
    /// Requests per second allowed on the conversation routes.
    pub requests_per_sec: u64,
    /// Bearer token required on conversation routes. Auth is off when unset.
    pub api_token: Option<String>,
    /// Extra browser origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            default_user_id: "default_user".to_string(),
            requests_per_sec: 100,
            api_token: None,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Conversation persistence and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file name inside `general.data_dir`.
    pub db_file: String,
    /// Days a conversation lives after its last write.
    pub retention_days: u32,
    /// Minutes between purge cycles.
    pub purge_interval_minutes: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: "ask2slide.db".to_string(),
            retention_days: 7,
            purge_interval_minutes: 60,
        }
    }
}

impl StorageConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }
}

/// External retrieval service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub base_url: String,
    /// Snippets requested per query.
    pub top_k: usize,
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8085".to_string(),
            top_k: 5,
            timeout_secs: 30,
        }
    }
}

/// External OpenAI-compatible completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Completion timeout. Multimodal inference is slow.
    pub timeout_secs: u64,
    pub health_timeout_secs: u64,
    /// Value of the health `status` field that means the model is serving.
    pub ready_status: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            model: "Qwen2.5-VL-7B-instruct".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
            timeout_secs: 120,
            health_timeout_secs: 5,
            ready_status: "ready".to_string(),
        }
    }
}

/// Message orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Characters kept when deriving a title from the first message.
    pub title_max_chars: usize,
    /// Longest accepted user message, in characters.
    pub max_message_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            title_max_chars: 30,
            max_message_chars: 8000,
        }
    }
}
