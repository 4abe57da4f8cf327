//! Error types for the conversational core.

use aibrew_core::error::AibrewError;
use aibrew_core::types::ImageError;
use aibrew_gateway::GatewayError;
use aibrew_speech::TranscriptionError;

use crate::turn::TurnState;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("a turn is already in progress for this session")]
    TurnInFlight,
    #[error("invalid turn transition: {from} -> {to}")]
    InvalidTransition { from: TurnState, to: TurnState },
    #[error("API keys required")]
    CredentialsMissing,
    #[error("API keys are managed by the server")]
    CredentialsManaged,
    #[error("invalid API keys: {0}")]
    InvalidCredentials(String),
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("invalid image: {0}")]
    InvalidImage(#[from] ImageError),
    #[error("invalid voice clip: {0}")]
    InvalidAudio(String),
    #[error("failed to transcribe audio: {0}")]
    Transcription(#[source] TranscriptionError),
    #[error("model gateway error: {0}")]
    Gateway(#[source] GatewayError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TranscriptionError> for ChatError {
    fn from(err: TranscriptionError) -> Self {
        match err {
            TranscriptionError::InvalidAudio(msg) => ChatError::InvalidAudio(msg),
            other => ChatError::Transcription(other),
        }
    }
}

impl From<GatewayError> for ChatError {
    fn from(err: GatewayError) -> Self {
        ChatError::Gateway(err)
    }
}

impl From<ChatError> for AibrewError {
    fn from(err: ChatError) -> Self {
        AibrewError::Chat(err.to_string())
    }
}
