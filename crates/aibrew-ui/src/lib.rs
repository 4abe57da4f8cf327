//! AI Brewery UI crate - embedded chat page and server-side transcript rendering.
//!
//! The chat page is a single self-contained HTML file with all CSS and
//! JavaScript inline, embedded at compile time via `include_str!` and filled
//! in with the recorder settings when served.
//!
//! # Modules
//!
//! - [`page`]: The chat page served from `/`
//! - [`render`]: Transcript to HTML fragment, served from
//!   `/api/sessions/{id}/transcript`
//!
//! # Usage
//!
//! ```rust,ignore
//! use aibrew_ui::chat_page;
//!
//! async fn index_handler() -> axum::response::Html<String> {
//!     axum::response::Html(chat_page(16_000, 5))
//! }
//! ```

pub mod page;
pub mod render;

pub use page::{chat_page, CHAT_HTML};
pub use render::{escape_html, render_transcript};
