//! Per-browser-session chat state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use aibrew_core::types::{ImageAttachment, Message};

use crate::error::ChatError;
use crate::services::SessionServices;
use crate::transcript::Transcript;
use crate::turn::{TurnMachine, TurnState};

/// A session behind its lock, as held by the registry and in-flight turns.
pub type SharedSession = Arc<Mutex<ChatSession>>;

/// Transcript, current image and turn state for one conversation.
#[derive(Debug)]
pub struct ChatSession {
    id: Uuid,
    transcript: Transcript,
    image: Option<ImageAttachment>,
    turn: TurnMachine,
    services: Option<SessionServices>,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

/// Serializable snapshot of a session for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub id: Uuid,
    pub turn_state: TurnState,
    pub message_count: usize,
    pub image: Option<String>,
    pub credentials_ready: bool,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(id: Uuid, services: Option<SessionServices>) -> Self {
        let now = Utc::now();
        Self {
            id,
            transcript: Transcript::new(),
            image: None,
            turn: TurnMachine::new(),
            services,
            created_at: now,
            last_active: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.all()
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.transcript.append(message);
        self.touch();
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    /// Replace the session image. It stays attached to every later turn
    /// until replaced or cleared.
    pub fn set_image(&mut self, image: ImageAttachment) {
        tracing::debug!(
            session_id = %self.id,
            file_name = %image.file_name,
            bytes = image.len(),
            "Session image set"
        );
        self.image = Some(image);
        self.touch();
    }

    /// Remove the session image. Returns whether one was attached.
    pub fn clear_image(&mut self) -> bool {
        self.touch();
        self.image.take().is_some()
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn.current()
    }

    pub(crate) fn turn_mut(&mut self) -> &mut TurnMachine {
        &mut self.turn
    }

    /// Service clients for this session, or `CredentialsMissing` until keys
    /// have been supplied.
    pub fn services(&self) -> Result<SessionServices, ChatError> {
        self.services.clone().ok_or(ChatError::CredentialsMissing)
    }

    pub fn has_services(&self) -> bool {
        self.services.is_some()
    }

    pub(crate) fn set_services(&mut self, services: SessionServices) {
        self.services = Some(services);
        self.touch();
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Whether the session has been idle for longer than `timeout` at `now`.
    ///
    /// A session with a turn in flight is never considered idle.
    pub fn is_expired_at(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        if !self.turn.is_idle() {
            return false;
        }
        now.signed_duration_since(self.last_active)
            .to_std()
            .map(|elapsed| elapsed > timeout)
            .unwrap_or(false)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            id: self.id,
            turn_state: self.turn.current(),
            message_count: self.transcript.len(),
            image: self.image.as_ref().map(|i| i.file_name.clone()),
            credentials_ready: self.services.is_some(),
            created_at: self.created_at,
            last_active: self.last_active,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_last_active(&mut self, at: DateTime<Utc>) {
        self.last_active = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn png(name: &str) -> ImageAttachment {
        ImageAttachment::from_upload(
            name,
            Bytes::from_static(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
        )
        .unwrap()
    }

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = ChatSession::new(Uuid::new_v4(), None);
        assert_eq!(session.turn_state(), TurnState::Idle);
        assert!(session.messages().is_empty());
        assert!(session.image().is_none());
        assert!(matches!(session.services(), Err(ChatError::CredentialsMissing)));
    }

    #[test]
    fn test_image_replace_and_clear() {
        let mut session = ChatSession::new(Uuid::new_v4(), None);
        session.set_image(png("a.png"));
        session.set_image(png("b.png"));
        assert_eq!(session.image().unwrap().file_name, "b.png");

        assert!(session.clear_image());
        assert!(session.image().is_none());
        assert!(!session.clear_image());
    }

    #[test]
    fn test_expiry() {
        let mut session = ChatSession::new(Uuid::new_v4(), None);
        let now = Utc::now();
        session.set_last_active(now - chrono::Duration::minutes(61));
        assert!(session.is_expired_at(now, Duration::from_secs(60 * 60)));
        assert!(!session.is_expired_at(now, Duration::from_secs(2 * 60 * 60)));
    }

    #[test]
    fn test_session_with_turn_in_flight_never_expires() {
        let mut session = ChatSession::new(Uuid::new_v4(), None);
        session.turn_mut().transition(TurnState::AwaitingReply).unwrap();
        let now = Utc::now();
        session.set_last_active(now - chrono::Duration::days(1));
        assert!(!session.is_expired_at(now, Duration::from_secs(60)));
    }

    #[test]
    fn test_status_snapshot() {
        let mut session = ChatSession::new(Uuid::new_v4(), None);
        session.append(Message::user("hi"));
        session.set_image(png("cat.png"));

        let status = session.status();
        assert_eq!(status.id, session.id());
        assert_eq!(status.message_count, 1);
        assert_eq!(status.image.as_deref(), Some("cat.png"));
        assert!(!status.credentials_ready);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["turn_state"], "idle");
    }
}
