//! Speech-to-text adapter.
//!
//! Provides a trait-based abstraction over the remote transcription service,
//! the Sarvam HTTP client, WAV clip validation, and a mock implementation for
//! tests and offline development.

pub mod sarvam;
pub mod wav;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use aibrew_core::error::AibrewError;

pub use sarvam::{SarvamSettings, SarvamTranscriber};
pub use wav::{encode_pcm16, AudioClip, WavInfo};

// =============================================================================
// Errors
// =============================================================================

/// Errors from the transcription adapter.
///
/// A non-200 response is always an error value, never a transcript string,
/// so an upstream failure can't be appended to a transcript as user speech.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("transcription request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transcription service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transcription service returned no transcript")]
    EmptyTranscript,
    #[error("invalid audio clip: {0}")]
    InvalidAudio(String),
    #[error("could not decode transcription response: {0}")]
    Decode(String),
}

impl From<TranscriptionError> for AibrewError {
    fn from(err: TranscriptionError) -> Self {
        AibrewError::Transcription(err.to_string())
    }
}

// =============================================================================
// Trait
// =============================================================================

/// Service converting a recorded clip into text.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe a WAV clip.
    ///
    /// Returns the recognized text, trimmed and non-empty. An empty result is
    /// reported as `TranscriptionError::EmptyTranscript`.
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscriptionError>;
}

/// Normalize a raw transcript field into the adapter's contract.
pub(crate) fn non_empty_transcript(raw: Option<String>) -> Result<String, TranscriptionError> {
    match raw.map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(TranscriptionError::EmptyTranscript),
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

#[derive(Debug, Clone)]
enum MockOutcome {
    Transcript(String),
    Status(u16, String),
    Empty,
}

/// Mock transcription service returning a fixed outcome.
///
/// Counts calls so tests can assert that a rejected clip never reached the
/// remote service.
#[derive(Debug)]
pub struct MockTranscriptionService {
    outcome: MockOutcome,
    calls: AtomicUsize,
}

impl MockTranscriptionService {
    /// Always returns `transcript`.
    pub fn new(transcript: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Transcript(transcript.into()))
    }

    /// Always fails as if the service answered with `status`.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Status(status, body.into()))
    }

    /// Always answers 200 without a transcript.
    pub fn empty() -> Self {
        Self::with_outcome(MockOutcome::Empty)
    }

    fn with_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTranscriptionService {
    fn default() -> Self {
        Self::new("[mock transcription]")
    }
}

#[async_trait]
impl TranscriptionService for MockTranscriptionService {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            duration_secs = clip.info().duration_secs(),
            "Mock transcription requested"
        );

        match &self.outcome {
            MockOutcome::Transcript(text) => non_empty_transcript(Some(text.clone())),
            MockOutcome::Status(status, body) => Err(TranscriptionError::Status {
                status: *status,
                body: body.clone(),
            }),
            MockOutcome::Empty => non_empty_transcript(None),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn clip() -> AudioClip {
        AudioClip::from_wav(Bytes::from(encode_pcm16(&[0; 1600], 16_000, 1))).unwrap()
    }

    #[tokio::test]
    async fn test_mock_returns_transcript() {
        let service = MockTranscriptionService::new("hello");
        assert_eq!(service.transcribe(&clip()).await.unwrap(), "hello");
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure_is_typed_error() {
        let service = MockTranscriptionService::failing(500, "boom");
        let err = service.transcribe(&clip()).await.unwrap_err();
        match err {
            TranscriptionError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected Status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mock_empty_is_failure() {
        let service = MockTranscriptionService::empty();
        let err = service.transcribe(&clip()).await.unwrap_err();
        assert!(matches!(err, TranscriptionError::EmptyTranscript));
    }

    #[tokio::test]
    async fn test_mock_whitespace_transcript_is_failure() {
        let service = MockTranscriptionService::new("   ");
        assert!(matches!(
            service.transcribe(&clip()).await,
            Err(TranscriptionError::EmptyTranscript)
        ));
    }

    #[test]
    fn test_non_empty_transcript_trims() {
        assert_eq!(
            non_empty_transcript(Some("  hi there \n".to_string())).unwrap(),
            "hi there"
        );
        assert!(non_empty_transcript(None).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = TranscriptionError::Status {
            status: 403,
            body: "invalid key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "transcription service returned 403: invalid key"
        );
        let core: AibrewError = err.into();
        assert!(matches!(core, AibrewError::Transcription(_)));
    }
}
