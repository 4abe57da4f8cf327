//! Route handler functions for all API endpoints.
//!
//! Each handler looks up its session by the path id, works on it through the
//! chat engine, and returns JSON (or HTML for the page and transcript).

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aibrew_chat::registry::lock;
use aibrew_chat::{ApiKeys, ChatError, SessionStatus, TurnOutcome};
use aibrew_core::config::CredentialMode;
use aibrew_core::types::{ImageAttachment, Message};
use aibrew_speech::AudioClip;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub gemini_api_key: String,
    pub sarvam_api_key: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub credentials_required: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

/// Result of a text or voice turn.
#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponse {
    /// What the transcription service heard; voice turns only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_text: Option<String>,
    /// The user message and the assistant reply added by this turn.
    pub messages: Vec<Message>,
    /// The whole transcript after the turn.
    pub transcript: Vec<Message>,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            transcript_text: outcome.transcript_text,
            messages: vec![outcome.user, outcome.assistant],
            transcript: outcome.transcript,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

// =============================================================================
// Page and health
// =============================================================================

/// GET / - serve the self-contained chat page, recording at the configured
/// sample rate and length.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let voice = state.orchestrator.voice_profile();
    Html(aibrew_ui::chat_page(voice.sample_rate, voice.record_seconds))
}

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.registry.len(),
    })
}

// =============================================================================
// Sessions
// =============================================================================

/// POST /api/sessions - start a new chat session.
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let session_id = state.registry.create()?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            credentials_required: state.registry.mode() == CredentialMode::Interactive,
        }),
    ))
}

/// GET /api/sessions/{id} - session status.
pub async fn get_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SessionStatus>, ApiError> {
    let session = state.registry.get(id)?;
    let status = lock(&session)?.status();
    Ok(Json(status))
}

/// DELETE /api/sessions/{id} - end a session, dropping its transcript and image.
pub async fn delete_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.registry.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/{id}/credentials - supply API keys (interactive mode).
pub async fn set_credentials(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> Result<Json<SessionStatus>, ApiError> {
    let keys = ApiKeys::new(&body.gemini_api_key, &body.sarvam_api_key)?;
    state.registry.set_credentials(id, &keys)?;
    let session = state.registry.get(id)?;
    let status = lock(&session)?.status();
    Ok(Json(status))
}

// =============================================================================
// Turns
// =============================================================================

/// GET /api/sessions/{id}/messages - transcript as JSON.
pub async fn list_messages(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let session = state.registry.get(id)?;
    let messages = lock(&session)?.messages().to_vec();
    Ok(Json(MessagesResponse { messages }))
}

/// POST /api/sessions/{id}/messages - text turn.
pub async fn send_message(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<SendMessageRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let session = state.registry.get(id)?;
    let outcome = state.orchestrator.submit_text(&session, &body.text).await?;
    Ok(Json(outcome.into()))
}

/// POST /api/sessions/{id}/voice - voice turn from a WAV clip in field `audio`.
pub async fn send_voice(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let session = state.registry.get(id)?;
    let mut multipart = multipart?;
    let upload = read_upload(&mut multipart, "audio", state.config.chat.max_audio_bytes).await?;
    let clip = AudioClip::from_wav(upload.data).map_err(ChatError::from)?;

    tracing::debug!(
        session_id = %id,
        bytes = clip.len(),
        duration_secs = clip.info().duration_secs(),
        "Voice clip received"
    );

    let outcome = state.orchestrator.submit_voice(&session, clip).await?;
    Ok(Json(outcome.into()))
}

/// GET /api/sessions/{id}/transcript - transcript rendered as an HTML fragment.
pub async fn transcript_html(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Html<String>, ApiError> {
    let session = state.registry.get(id)?;
    let html = aibrew_ui::render_transcript(lock(&session)?.messages());
    Ok(Html(html))
}

// =============================================================================
// Image
// =============================================================================

/// PUT /api/sessions/{id}/image - set the session image from field `image`.
pub async fn put_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImageResponse>, ApiError> {
    let session = state.registry.get(id)?;
    let mut multipart = multipart?;
    let upload = read_upload(&mut multipart, "image", state.config.chat.max_image_bytes).await?;
    let file_name = upload
        .file_name
        .ok_or_else(|| ApiError::BadRequest("image upload must include a file name".into()))?;

    let image = ImageAttachment::from_upload(file_name, upload.data).map_err(ChatError::from)?;
    let response = ImageResponse {
        file_name: image.file_name.clone(),
        mime_type: image.mime_type().to_string(),
        size_bytes: image.len(),
    };

    lock(&session)?.set_image(image);
    Ok(Json(response))
}

/// GET /api/sessions/{id}/image - current image bytes for the preview.
pub async fn get_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.registry.get(id)?;
    let image = lock(&session)?
        .image()
        .cloned()
        .ok_or_else(|| ApiError::NotFound("no image uploaded for this session".into()))?;

    Ok(([(header::CONTENT_TYPE, image.mime_type())], image.data))
}

/// DELETE /api/sessions/{id}/image - clear the session image.
pub async fn delete_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let session = state.registry.get(id)?;
    lock(&session)?.clear_image();
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Multipart helpers
// =============================================================================

struct Upload {
    file_name: Option<String>,
    data: Bytes,
}

/// Read the first multipart field named `field_name`, enforcing `limit` bytes.
async fn read_upload(
    multipart: &mut Multipart,
    field_name: &str,
    limit: usize,
) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;
        if data.len() > limit {
            return Err(ApiError::PayloadTooLarge(format!(
                "{} upload is {} bytes, limit is {} bytes",
                field_name,
                data.len(),
                limit
            )));
        }
        return Ok(Upload { file_name, data });
    }
    Err(ApiError::BadRequest(format!(
        "missing multipart field '{}'",
        field_name
    )))
}
