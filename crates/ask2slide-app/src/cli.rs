//! CLI argument definitions for the Ask2Slide gateway.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Ask2Slide - chat gateway for a hosted multimodal model with document retrieval.
#[derive(Parser, Debug)]
#[command(name = "ask2slide", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Data directory holding the SQLite database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Print a fresh API token for `server.api_token` and exit.
    #[arg(long = "generate-token")]
    pub generate_token: bool,
}

impl CliArgs {
    /// Priority: --config flag > ASK2SLIDE_CONFIG env var > ~/.ask2slide/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ASK2SLIDE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --port flag > ASK2SLIDE_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("ASK2SLIDE_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }

    /// `None` when the flag is absent and the config value applies.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".ask2slide").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

pub fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    std::env::var(var).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let args = CliArgs::parse_from([
            "ask2slide",
            "--config",
            "/etc/ask2slide.toml",
            "-p",
            "9000",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/ask2slide.toml"));
        assert_eq!(args.resolve_port(8000), 9000);
        assert_eq!(args.resolve_log_level().as_deref(), Some("debug"));
        assert!(args.resolve_data_dir().is_none());
        assert!(!args.generate_token);
    }

    #[test]
    fn test_generate_token_flag() {
        let args = CliArgs::parse_from(["ask2slide", "--generate-token"]);
        assert!(args.generate_token);
    }
}
