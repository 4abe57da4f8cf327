//! Conversational core of the chat server.
//!
//! Holds the per-session transcript and image, the turn state machine, the
//! orchestrator that drives a text or voice turn through the transcription
//! service and the model gateway, and the in-memory session registry.

pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod services;
pub mod session;
pub mod transcript;
pub mod turn;
pub mod voice;

pub use error::ChatError;
pub use orchestrator::{TurnOrchestrator, TurnOutcome};
pub use registry::SessionRegistry;
pub use services::{ApiKeys, MockServiceProvider, RemoteServiceProvider, ServiceProvider, SessionServices};
pub use session::{ChatSession, SessionStatus, SharedSession};
pub use transcript::Transcript;
pub use turn::{TurnMachine, TurnState};
pub use voice::VoiceProfile;
