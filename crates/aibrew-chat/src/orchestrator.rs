//! Turn orchestrator: drives one user turn through transcription and the
//! model gateway and records it in the session transcript.
//!
//! The session lock is never held across a network call. A turn claims the
//! session by moving its state machine out of Idle, releases the lock while
//! waiting on the remote services, then re-locks to record the outcome.

use aibrew_core::config::AibrewConfig;
use aibrew_core::types::{Message, TurnContents};
use aibrew_speech::AudioClip;

use crate::error::ChatError;
use crate::registry::lock;
use crate::services::SessionServices;
use crate::session::{ChatSession, SharedSession};
use crate::turn::TurnState;
use crate::voice::VoiceProfile;

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Recognized speech, for voice turns.
    pub transcript_text: Option<String>,
    pub user: Message,
    pub assistant: Message,
    /// Full transcript after the turn.
    pub transcript: Vec<Message>,
}

/// Coordinates text and voice turns against a session.
#[derive(Debug, Clone)]
pub struct TurnOrchestrator {
    max_message_chars: usize,
    voice: VoiceProfile,
}

impl TurnOrchestrator {
    pub fn new(max_message_chars: usize, voice: VoiceProfile) -> Self {
        Self {
            max_message_chars,
            voice,
        }
    }

    pub fn from_config(config: &AibrewConfig) -> Self {
        Self::new(
            config.chat.max_message_chars,
            VoiceProfile::from_config(&config.transcription),
        )
    }

    pub fn voice_profile(&self) -> &VoiceProfile {
        &self.voice
    }

    /// Submit a typed message.
    ///
    /// Empty or whitespace-only text is rejected without touching the
    /// transcript. On a gateway failure the user message stays in the
    /// transcript, no assistant message is added and the session returns to
    /// Idle.
    pub async fn submit_text(
        &self,
        session: &SharedSession,
        text: &str,
    ) -> Result<TurnOutcome, ChatError> {
        let text = self.validate_text(text)?;
        let (guard, services) = TurnGuard::begin(session, TurnState::AwaitingReply)?;

        let (user, contents) = {
            let mut s = guard.lock()?;
            record_user_message(&mut s, text)
        };

        self.await_reply(guard, services, user, contents, None).await
    }

    /// Submit a recorded voice clip.
    ///
    /// The clip is transcribed first. A transcription failure, including an
    /// empty transcript, ends the turn with nothing appended. So does a
    /// transcript over the message length limit. Otherwise the
    /// transcript becomes the user message and the turn continues as a text
    /// turn.
    pub async fn submit_voice(
        &self,
        session: &SharedSession,
        clip: AudioClip,
    ) -> Result<TurnOutcome, ChatError> {
        self.voice.check(&clip)?;
        let (guard, services) = TurnGuard::begin(session, TurnState::Transcribing)?;

        let transcript_text = match services.transcriber.transcribe(&clip).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    session_id = %guard.session_id(),
                    error = %e,
                    "Transcription failed"
                );
                guard.finish(|_| ())?;
                return Err(e.into());
            }
        };
        tracing::debug!(
            session_id = %guard.session_id(),
            chars = transcript_text.chars().count(),
            "Voice clip transcribed"
        );
        let transcript_text = match self.validate_text(&transcript_text) {
            Ok(text) => text,
            Err(e) => {
                guard.finish(|_| ())?;
                return Err(e);
            }
        };

        let (user, contents) = {
            let mut s = guard.lock()?;
            s.turn_mut().transition(TurnState::AwaitingReply)?;
            record_user_message(&mut s, transcript_text.clone())
        };

        self.await_reply(guard, services, user, contents, Some(transcript_text))
            .await
    }

    async fn await_reply(
        &self,
        guard: TurnGuard<'_>,
        services: SessionServices,
        user: Message,
        contents: TurnContents,
        transcript_text: Option<String>,
    ) -> Result<TurnOutcome, ChatError> {
        let session_id = guard.session_id();
        let reply = services.gateway.reply(&contents).await;

        guard.finish(|s| match reply {
            Ok(reply) => {
                let assistant = Message::assistant(reply);
                s.append(assistant.clone());
                tracing::info!(
                    session_id = %session_id,
                    messages = s.messages().len(),
                    "Turn completed"
                );
                Ok(TurnOutcome {
                    transcript_text,
                    user,
                    assistant,
                    transcript: s.messages().to_vec(),
                })
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Model reply failed");
                Err(ChatError::from(e))
            }
        })?
    }

    fn validate_text(&self, text: &str) -> Result<String, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.max_message_chars {
            return Err(ChatError::MessageTooLong(self.max_message_chars));
        }
        Ok(text.to_string())
    }
}

impl Default for TurnOrchestrator {
    fn default() -> Self {
        Self::new(MAX_MESSAGE_LENGTH, VoiceProfile::default())
    }
}

/// Append the user message and snapshot what goes to the model: the text plus
/// the session image as it is right now.
fn record_user_message(session: &mut ChatSession, text: String) -> (Message, TurnContents) {
    let user = Message::user(text.clone());
    session.append(user.clone());
    let contents = TurnContents::new(text, session.image().cloned());
    (user, contents)
}

// =============================================================================
// Turn guard
// =============================================================================

/// Claim on a session's turn.
///
/// If the turn future is dropped before finishing (for example the client
/// disconnected), the session is put back to Idle so later turns aren't
/// rejected forever.
struct TurnGuard<'a> {
    session: &'a SharedSession,
    session_id: uuid::Uuid,
    armed: bool,
}

impl<'a> TurnGuard<'a> {
    /// Move the session out of Idle into `first`.
    fn begin(
        session: &'a SharedSession,
        first: TurnState,
    ) -> Result<(Self, SessionServices), ChatError> {
        let mut s = lock(session)?;
        let services = s.services()?;
        if s.turn_state() != TurnState::Idle {
            return Err(ChatError::TurnInFlight);
        }
        s.turn_mut().transition(first)?;
        s.touch();
        let session_id = s.id();
        drop(s);

        Ok((
            Self {
                session,
                session_id,
                armed: true,
            },
            services,
        ))
    }

    fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'a, ChatSession>, ChatError> {
        lock(self.session)
    }

    /// Run `f` against the session and return it to Idle.
    fn finish<T>(mut self, f: impl FnOnce(&mut ChatSession) -> T) -> Result<T, ChatError> {
        let mut s = lock(self.session)?;
        let out = f(&mut s);
        s.turn_mut().transition(TurnState::Idle)?;
        self.armed = false;
        Ok(out)
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Ok(mut s) = self.session.lock() {
                s.turn_mut().reset();
            }
        }
    }
}
