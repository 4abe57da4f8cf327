//! Router setup with all routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, per-route
//! upload limits and all endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use aibrew_core::config::AibrewConfig;
use aibrew_core::error::AibrewError;

use crate::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the payload limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Limit for JSON bodies (messages and credentials).
const JSON_BODY_LIMIT: usize = 64 * 1024;

/// Create the axum Router with all routes and middleware.
///
/// # Arguments
/// * `state` - The shared application state.
///
/// # Returns
/// A fully configured axum Router ready to serve requests.
pub fn create_router(state: AppState) -> Router {
    // CORS middleware: allow the page's own localhost origins.
    let port = state.config.general.port;
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let image_limit = state.config.chat.max_image_bytes + MULTIPART_OVERHEAD;
    let audio_limit = state.config.chat.max_audio_bytes + MULTIPART_OVERHEAD;

    let session_routes = Router::new()
        .route("/api/sessions", post(handlers::create_session))
        .route(
            "/api/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route(
            "/api/sessions/{id}/credentials",
            post(handlers::set_credentials),
        )
        .route(
            "/api/sessions/{id}/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        .route(
            "/api/sessions/{id}/voice",
            post(handlers::send_voice).layer(DefaultBodyLimit::max(audio_limit)),
        )
        .route(
            "/api/sessions/{id}/transcript",
            get(handlers::transcript_html),
        )
        .route(
            "/api/sessions/{id}/image",
            get(handlers::get_image)
                .put(handlers::put_image)
                .delete(handlers::delete_image)
                .layer(DefaultBodyLimit::max(image_limit)),
        );

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .merge(session_routes)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Runs until `shutdown` resolves.
pub async fn start_server(
    config: &AibrewConfig,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), AibrewError> {
    let addr = format!("{}:{}", config.general.host, config.general.port);

    let router = create_router(state);

    tracing::info!("Starting chat server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AibrewError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AibrewError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
