//! Chat page embedding.
//!
//! The page is a single HTML file with inline CSS and JavaScript. It talks to
//! the JSON API under `/api/sessions`, records voice clips in the browser with
//! Web Audio, and encodes them as mono 16-bit WAV before upload. The recording
//! length and sample rate are filled in at serve time so the browser records
//! exactly what the server accepts.

/// The chat page template.
///
/// Provides:
///
/// - **Image**: jpg/jpeg/png upload with preview and clear
/// - **Voice**: "Record Voice (Ns)" button, fixed-length capture
/// - **Text**: single-line message form
/// - **Transcript**: server-rendered bubbles, refreshed after every turn
/// - **Keys**: API key form shown when the server runs in interactive mode
///
/// Contains `{{SAMPLE_RATE}}` and `{{RECORD_SECONDS}}` placeholders; serve it
/// through [`chat_page`].
pub const CHAT_HTML: &str = include_str!("../assets/chat.html");

/// Render the chat page for the given recorder settings.
pub fn chat_page(sample_rate: u32, record_seconds: u32) -> String {
    CHAT_HTML
        .replace("{{SAMPLE_RATE}}", &sample_rate.to_string())
        .replace("{{RECORD_SECONDS}}", &record_seconds.to_string())
}
