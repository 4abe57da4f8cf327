//! AI Brewery chat server binary - composition root.
//!
//! 1. Load `.env`, then configuration from TOML, env vars and CLI flags
//! 2. Build the remote service provider (Sarvam speech-to-text + Gemini)
//! 3. Start the idle-session sweeper
//! 4. Serve the chat page and API until Ctrl-C

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use aibrew_api::routes;
use aibrew_api::state::AppState;
use aibrew_chat::{RemoteServiceProvider, SessionRegistry};
use aibrew_core::config::{AibrewConfig, CredentialMode};

use cli::CliArgs;

/// How often the sweeper looks for idle sessions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drop sessions that have been idle past the configured timeout.
async fn session_sweeper(registry: Arc<SessionRegistry>, idle_timeout: Duration) {
    tracing::info!(
        idle_timeout_secs = idle_timeout.as_secs(),
        "Session sweeper started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = registry.evict_idle(idle_timeout) {
            tracing::warn!(error = %e, "Session sweep failed");
        }
    }
}

/// Configured idle timeout, saturating on absurdly large values.
fn idle_timeout(config: &AibrewConfig) -> Duration {
    Duration::from_secs(config.chat.session_idle_timeout_minutes.saturating_mul(60))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn warn_on_missing_keys(config: &AibrewConfig) {
    if config.credentials.mode != CredentialMode::Server {
        tracing::info!("Interactive key mode: each session must supply its own API keys");
        return;
    }
    if config.credentials.gemini_api_key.is_none() {
        tracing::warn!("No Gemini API key configured (set API_KEY); turns will be rejected");
    }
    if config.credentials.sarvam_api_key.is_none() {
        tracing::warn!("No Sarvam API key configured (set SARVAM_API_KEY); turns will be rejected");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // .env must be loaded before env overrides are read.
    let dotenv_path = dotenvy::dotenv().ok();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = AibrewConfig::load_or_default(&config_file);
    config.apply_env_overrides();
    args.apply_to(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting AI Brewery chat v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv_path {
        tracing::info!(path = %path.display(), "Loaded .env");
    }
    tracing::info!(path = %config_file.display(), "Configuration loaded");
    tracing::debug!(credentials = ?config.credentials, "Credential settings");
    warn_on_missing_keys(&config);

    // Services.
    let provider = Arc::new(RemoteServiceProvider::from_config(&config));
    let state = AppState::new(config.clone(), provider)?;
    tracing::info!(
        stt_endpoint = %config.transcription.endpoint,
        model = %config.gateway.model,
        "Remote services configured"
    );

    // === Background tasks ===

    let timeout = idle_timeout(&config);
    let registry = Arc::clone(&state.registry);
    tokio::spawn(async move {
        session_sweeper(registry, timeout).await;
    });

    // === HTTP server ===

    tracing::info!(
        "Chat page at http://{}:{}/",
        config.general.host,
        config.general.port
    );
    if let Err(e) = routes::start_server(&config, state, shutdown_signal()).await {
        tracing::error!(error = %e, "Server stopped");
        tracing::error!(
            "Try: AIBREW_PORT={} cargo run -p aibrew-app",
            config.general.port.saturating_add(1)
        );
        return Err(e.into());
    }

    tracing::info!("Server shut down");
    Ok(())
}
