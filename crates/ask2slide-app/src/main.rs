//! Ask2Slide gateway binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the SQLite conversation store
//! 3. Build the retrieval and completion clients
//! 4. Start the background retention purge
//! 5. Serve the REST API

mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use ask2slide_api::{routes, AppState};
use ask2slide_chat::{CompletionClient, MessageOrchestrator, RetrievalClient};
use ask2slide_core::clock::{Clock, SystemClock};
use ask2slide_core::config::Ask2SlideConfig;
use ask2slide_storage::{ConversationStore, Database, RetentionManager, SqliteConversationStore};

use crate::cli::CliArgs;

/// Delete expired conversations every `interval_minutes`.
async fn purge_loop(db: Arc<Database>, clock: Arc<dyn Clock>, interval_minutes: u32) {
    let period = Duration::from_secs(u64::from(interval_minutes.max(1)) * 60);
    tracing::info!(interval_minutes, "Retention purge loop started");

    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        match RetentionManager::run_purge(&db, clock.as_ref()) {
            Ok(result) => tracing::debug!(
                conversations_deleted = result.conversations_deleted,
                "Retention purge finished"
            ),
            Err(e) => tracing::warn!(error = %e, "Retention purge failed"),
        }
    }
}

/// Expand ~ to the home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if let Some(rest) = data_dir
        .strip_prefix("~/")
        .or_else(|| data_dir.strip_prefix("~\\"))
    {
        let home = cli::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(rest)
    } else {
        PathBuf::from(data_dir)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    if args.generate_token {
        println!("{}", ask2slide_api::auth::generate_token());
        return Ok(());
    }

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = Ask2SlideConfig::load_or_default(&config_file);
    config.server.port = args.resolve_port(config.server.port);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(&config.general.log_level)
            }),
        )
        .init();

    tracing::info!("Starting Ask2Slide v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let db_path = data_dir.join(&config.storage.db_file);
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn ConversationStore> = Arc::new(SqliteConversationStore::new(
        Arc::clone(&db),
        Arc::clone(&clock),
        config.storage.retention(),
    ));

    // Upstream clients.
    let retriever = Arc::new(RetrievalClient::new(&config.retrieval)?);
    let completion = Arc::new(CompletionClient::new(&config.completion)?);
    tracing::info!(
        retrieval = %config.retrieval.base_url,
        completion = %config.completion.base_url,
        model = %config.completion.model,
        "Upstream clients ready"
    );

    let orchestrator = MessageOrchestrator::new(
        Arc::clone(&store),
        retriever,
        completion,
        config.chat.clone(),
        config.retrieval.top_k,
    )
    .with_clock(Arc::clone(&clock));

    // === Background tasks ===

    let purge_db = Arc::clone(&db);
    let purge_clock = Arc::clone(&clock);
    let purge_interval = config.storage.purge_interval_minutes;
    tokio::spawn(async move {
        purge_loop(purge_db, purge_clock, purge_interval).await;
    });

    // === API server ===

    if config.server.api_token.is_none() {
        tracing::warn!("No server.api_token configured; API authentication is disabled");
    }

    let server_config = config.server.clone();
    let state = AppState::new(config, store, orchestrator);

    if let Err(e) = routes::start_server(&server_config, state).await {
        tracing::error!(error = %e, "API server stopped");
        tracing::error!(
            "Try: ASK2SLIDE_PORT={} cargo run -p ask2slide-app",
            server_config.port.saturating_add(1)
        );
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_dir_plain() {
        assert_eq!(resolve_data_dir("/var/lib/ask2slide"), PathBuf::from("/var/lib/ask2slide"));
    }

    #[test]
    fn test_resolve_data_dir_expands_home() {
        let resolved = resolve_data_dir("~/.ask2slide/data");
        assert!(resolved.ends_with(".ask2slide/data"));
        assert!(!resolved.to_string_lossy().starts_with('~'));
    }
}
