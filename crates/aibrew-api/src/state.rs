//! Application state shared across all route handlers.
//!
//! AppState holds the configuration, the session registry and the turn
//! orchestrator. It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use aibrew_chat::{ServiceProvider, SessionRegistry, TurnOrchestrator};
use aibrew_core::config::AibrewConfig;
use aibrew_core::error::AibrewError;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. Sessions carry
/// their own locks inside the registry.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration. Read-only once the server is running.
    pub config: Arc<AibrewConfig>,
    /// Live chat sessions.
    pub registry: Arc<SessionRegistry>,
    /// Drives text and voice turns.
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState, building remote clients through `provider`.
    pub fn new(
        config: AibrewConfig,
        provider: Arc<dyn ServiceProvider>,
    ) -> Result<Self, AibrewError> {
        let registry = SessionRegistry::new(provider, &config.credentials)?;
        let orchestrator = TurnOrchestrator::from_config(&config);
        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            orchestrator: Arc::new(orchestrator),
            start_time: Instant::now(),
        })
    }
}
