//! Per-session remote service bindings.
//!
//! A session talks to the transcription service and the model gateway through
//! trait objects. Which concrete clients it gets depends on the credential
//! mode: server-held keys build one shared set at startup, interactive mode
//! builds a set per session when the user submits keys.

use std::fmt;
use std::sync::Arc;

use aibrew_core::config::{AibrewConfig, CredentialsConfig};
use aibrew_gateway::{GeminiGateway, GeminiSettings, MockGateway, ModelGateway};
use aibrew_speech::{MockTranscriptionService, SarvamSettings, SarvamTranscriber, TranscriptionService};

use crate::error::ChatError;

/// The pair of API keys a session needs.
#[derive(Clone)]
pub struct ApiKeys {
    gemini: String,
    sarvam: String,
}

impl ApiKeys {
    /// Validate and trim a key pair. Both keys must be non-blank.
    pub fn new(gemini: impl AsRef<str>, sarvam: impl AsRef<str>) -> Result<Self, ChatError> {
        let gemini = gemini.as_ref().trim();
        let sarvam = sarvam.as_ref().trim();
        if gemini.is_empty() {
            return Err(ChatError::InvalidCredentials("Gemini API key is blank".into()));
        }
        if sarvam.is_empty() {
            return Err(ChatError::InvalidCredentials("Sarvam API key is blank".into()));
        }
        Ok(Self {
            gemini: gemini.to_string(),
            sarvam: sarvam.to_string(),
        })
    }

    /// Keys held in server configuration, if both are present.
    pub fn from_config(credentials: &CredentialsConfig) -> Option<Self> {
        match (&credentials.gemini_api_key, &credentials.sarvam_api_key) {
            (Some(gemini), Some(sarvam)) => Self::new(gemini, sarvam).ok(),
            _ => None,
        }
    }

    pub fn gemini(&self) -> &str {
        &self.gemini
    }

    pub fn sarvam(&self) -> &str {
        &self.sarvam
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("gemini", &"<redacted>")
            .field("sarvam", &"<redacted>")
            .finish()
    }
}

/// Remote clients bound to one session.
#[derive(Clone)]
pub struct SessionServices {
    pub transcriber: Arc<dyn TranscriptionService>,
    pub gateway: Arc<dyn ModelGateway>,
}

impl fmt::Debug for SessionServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionServices").finish_non_exhaustive()
    }
}

/// Builds the service clients for a key pair.
pub trait ServiceProvider: Send + Sync {
    fn build(&self, keys: &ApiKeys) -> Result<SessionServices, ChatError>;
}

// =============================================================================
// Remote provider
// =============================================================================

/// Provider that builds real Sarvam and Gemini HTTP clients.
#[derive(Debug, Clone)]
pub struct RemoteServiceProvider {
    transcription: SarvamSettings,
    gateway: GeminiSettings,
}

impl RemoteServiceProvider {
    pub fn new(transcription: SarvamSettings, gateway: GeminiSettings) -> Self {
        Self {
            transcription,
            gateway,
        }
    }

    pub fn from_config(config: &AibrewConfig) -> Self {
        Self::new(
            SarvamSettings::from_config(&config.transcription),
            GeminiSettings::from_config(&config.gateway),
        )
    }
}

impl ServiceProvider for RemoteServiceProvider {
    fn build(&self, keys: &ApiKeys) -> Result<SessionServices, ChatError> {
        let transcriber = SarvamTranscriber::new(keys.sarvam(), self.transcription.clone())
            .map_err(|e| ChatError::Internal(format!("failed to build transcription client: {}", e)))?;
        let gateway = GeminiGateway::new(keys.gemini(), self.gateway.clone())
            .map_err(|e| ChatError::Internal(format!("failed to build model client: {}", e)))?;

        Ok(SessionServices {
            transcriber: Arc::new(transcriber),
            gateway: Arc::new(gateway),
        })
    }
}

// =============================================================================
// Mock provider
// =============================================================================

/// Provider handing every session the same mock clients.
///
/// The mocks are shared so tests can inspect what each session sent.
#[derive(Debug, Clone)]
pub struct MockServiceProvider {
    pub transcriber: Arc<MockTranscriptionService>,
    pub gateway: Arc<MockGateway>,
}

impl MockServiceProvider {
    pub fn new(transcriber: MockTranscriptionService, gateway: MockGateway) -> Self {
        Self {
            transcriber: Arc::new(transcriber),
            gateway: Arc::new(gateway),
        }
    }
}

impl Default for MockServiceProvider {
    fn default() -> Self {
        Self::new(MockTranscriptionService::default(), MockGateway::new())
    }
}

impl ServiceProvider for MockServiceProvider {
    fn build(&self, _keys: &ApiKeys) -> Result<SessionServices, ChatError> {
        Ok(SessionServices {
            transcriber: self.transcriber.clone(),
            gateway: self.gateway.clone(),
        })
    }
}
