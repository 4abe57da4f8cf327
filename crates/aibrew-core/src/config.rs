use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AibrewError, Result};

/// Environment variable holding the Gemini API key.
pub const ENV_GEMINI_API_KEY: &str = "API_KEY";
/// Environment variable holding the Sarvam API key.
pub const ENV_SARVAM_API_KEY: &str = "SARVAM_API_KEY";
/// Environment variable overriding the listen port.
pub const ENV_PORT: &str = "AIBREW_PORT";

/// Top-level configuration for the chat server.
///
/// Loaded from `~/.aibrew/config.toml` by default. Every section falls back
/// to its defaults when absent, so an empty file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AibrewConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AibrewConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AibrewConfig = toml::from_str(&content)?;
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
            toml::to_string_pretty(self).map_err(|e| AibrewError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored so that a blank `API_KEY=` line in a `.env`
    /// file does not wipe a key configured in the TOML file.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_GEMINI_API_KEY) {
            self.credentials.gemini_api_key = Some(key);
        }
        if let Some(key) = non_empty(ENV_SARVAM_API_KEY) {
            self.credentials.sarvam_api_key = Some(key);
        }
        if let Some(port) = non_empty(ENV_PORT) {
            match port.parse::<u16>() {
                Ok(p) => self.general.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid {}", ENV_PORT),
            }
        }
    }
}

/// General server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            log_level: "info".to_string(),
        }
    }
}

/// Where API keys come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMode {
    /// Keys are configured server-side and shared by every session.
    #[default]
    Server,
    /// Each session must supply both keys before its first turn.
    Interactive,
}

/// API key configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub mode: CredentialMode,
    /// Gemini API key (server mode only).
    pub gemini_api_key: Option<String>,
    /// Sarvam API key (server mode only).
    pub sarvam_api_key: Option<String>,
}

impl CredentialsConfig {
    /// Both keys are present and non-blank.
    pub fn is_complete(&self) -> bool {
        let present = |k: &Option<String>| k.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.gemini_api_key) && present(&self.sarvam_api_key)
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |k: &Option<String>| if k.is_some() { "<redacted>" } else { "<unset>" };
        f.debug_struct("CredentialsConfig")
            .field("mode", &self.mode)
            .field("gemini_api_key", &mask(&self.gemini_api_key))
            .field("sarvam_api_key", &mask(&self.sarvam_api_key))
            .finish()
    }
}

/// Speech-to-text service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Speech-to-text endpoint URL.
    pub endpoint: String,
    /// BCP-47 language code sent with every clip.
    pub language_code: String,
    /// Recognition model identifier.
    pub model: String,
    pub with_timestamps: bool,
    /// Length of the browser recording window.
    pub record_seconds: u32,
    /// Sample rate the browser records at.
    pub sample_rate: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.sarvam.ai/speech-to-text".to_string(),
            language_code: "en-IN".to_string(),
            model: "saarika:v2".to_string(),
            with_timestamps: false,
            record_seconds: 5,
            sample_rate: 16_000,
            timeout_secs: 60,
        }
    }
}

/// Generative model gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// API base URL, without the `/v1beta` suffix.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Chat session limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum characters in a single user message.
    pub max_message_chars: usize,
    /// Sessions idle longer than this are evicted.
    pub session_idle_timeout_minutes: u64,
    /// Largest accepted image upload.
    pub max_image_bytes: usize,
    /// Largest accepted voice clip.
    pub max_audio_bytes: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 2000,
            session_idle_timeout_minutes: 60,
            max_image_bytes: 10 * 1024 * 1024,
            max_audio_bytes: 2 * 1024 * 1024,
        }
    }
}
