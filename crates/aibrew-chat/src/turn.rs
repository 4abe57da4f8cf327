//! Turn state machine.
//!
//! Enforces the per-session turn lifecycle:
//! - Idle -> AwaitingReply (text submitted)
//! - Idle -> Transcribing (voice clip submitted)
//! - Transcribing -> AwaitingReply (transcript obtained)
//! - Transcribing -> Idle (transcription failed, turn dropped)
//! - AwaitingReply -> Idle (model replied or failed)

use std::fmt;

use serde::Serialize;

use crate::error::ChatError;

/// Where a session is in its current turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    Idle,
    Transcribing,
    AwaitingReply,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::Idle => write!(f, "Idle"),
            TurnState::Transcribing => write!(f, "Transcribing"),
            TurnState::AwaitingReply => write!(f, "AwaitingReply"),
        }
    }
}

impl TurnState {
    pub fn can_transition_to(&self, target: &TurnState) -> bool {
        matches!(
            (self, target),
            (TurnState::Idle, TurnState::AwaitingReply)
                | (TurnState::Idle, TurnState::Transcribing)
                | (TurnState::Transcribing, TurnState::AwaitingReply)
                | (TurnState::Transcribing, TurnState::Idle)
                | (TurnState::AwaitingReply, TurnState::Idle)
        )
    }
}

/// State machine owned by a single session.
///
/// Not internally synchronized: it lives inside the session's mutex.
#[derive(Debug, Default)]
pub struct TurnMachine {
    state: TurnState,
}

impl TurnMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> TurnState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == TurnState::Idle
    }

    /// Attempt to move to `target`.
    pub fn transition(&mut self, target: TurnState) -> Result<(), ChatError> {
        if self.state.can_transition_to(&target) {
            tracing::debug!("Turn state: {} -> {}", self.state, target);
            self.state = target;
            Ok(())
        } else {
            Err(ChatError::InvalidTransition {
                from: self.state,
                to: target,
            })
        }
    }

    /// Force the machine back to Idle after an abandoned turn.
    pub fn reset(&mut self) {
        if self.state != TurnState::Idle {
            tracing::warn!("Turn state machine reset to Idle from {}", self.state);
        }
        self.state = TurnState::Idle;
    }
}
