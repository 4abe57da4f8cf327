//! CLI argument definitions for the AI Brewery chat server.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use aibrew_core::config::{AibrewConfig, CredentialMode};

/// Environment variable naming an alternate config file.
const ENV_CONFIG: &str = "AIBREW_CONFIG";

/// AI Brewery: a browser chat with Gemini that accepts text, voice and images.
#[derive(Parser, Debug)]
#[command(name = "aibrew", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// HTTP server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Ask each browser session for its own API keys instead of using
    /// server-held keys.
    #[arg(long = "interactive-keys")]
    pub interactive_keys: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > AIBREW_CONFIG env var > ~/.aibrew/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(ENV_CONFIG) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply command-line overrides on top of an already env-resolved config.
    pub fn apply_to(&self, config: &mut AibrewConfig) {
        if let Some(ref host) = self.host {
            config.general.host = host.clone();
        }
        if let Some(port) = self.port {
            config.general.port = port;
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if self.interactive_keys {
            config.credentials.mode = CredentialMode::Interactive;
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".aibrew").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".aibrew").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_leave_config_untouched() {
        let args = CliArgs::parse_from(["aibrew"]);
        let mut config = AibrewConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.general.port, 8501);
        assert_eq!(config.general.host, "127.0.0.1");
        assert_eq!(config.credentials.mode, CredentialMode::Server);
    }

    #[test]
    fn test_flags_override_config() {
        let args = CliArgs::parse_from([
            "aibrew",
            "--host",
            "0.0.0.0",
            "-p",
            "9000",
            "--log-level",
            "debug",
            "--interactive-keys",
        ]);
        let mut config = AibrewConfig::default();
        config.general.port = 7000;
        args.apply_to(&mut config);

        assert_eq!(config.general.host, "0.0.0.0");
        assert_eq!(config.general.port, 9000);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.credentials.mode, CredentialMode::Interactive);
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let args = CliArgs::parse_from(["aibrew", "--config", "/tmp/custom.toml"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_default_config_path_file_name() {
        assert!(default_config_path().ends_with("config.toml"));
    }
}
