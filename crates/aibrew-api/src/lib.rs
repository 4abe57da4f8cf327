//! AI Brewery API crate - axum HTTP server and route handlers.
//!
//! Serves the chat page, the per-session JSON API for text, voice and image
//! turns, the rendered transcript fragment, and a health check.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
