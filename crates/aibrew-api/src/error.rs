//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error response format across all
//! endpoints, mapping chat engine errors to HTTP status codes.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use aibrew_chat::ChatError;
use aibrew_core::error::AibrewError;
use aibrew_core::types::ImageError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid input.
    BadRequest(String),
    /// 404 Not Found - unknown session or resource.
    NotFound(String),
    /// 409 Conflict - a turn is already in flight.
    Conflict(String),
    /// 412 Precondition Failed - API keys not supplied yet.
    PreconditionFailed(String),
    /// 413 Payload Too Large - upload over the configured limit.
    PayloadTooLarge(String),
    /// 415 Unsupported Media Type - upload is not an accepted image.
    UnsupportedMediaType(String),
    /// 422 Unprocessable Entity - the recording could not be transcribed.
    /// Reported to the user as a warning; the turn was dropped.
    UnprocessableEntity(String),
    /// 502 Bad Gateway - the model call failed.
    BadGateway(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::PreconditionFailed(msg) => {
                (StatusCode::PRECONDITION_FAILED, "precondition_failed", msg)
            }
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg)
            }
            ApiError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                msg,
            ),
            ApiError::UnprocessableEntity(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "transcription_failed", msg)
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), %message, "Request failed");
        }

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage
            | ChatError::MessageTooLong(_)
            | ChatError::InvalidCredentials(_)
            | ChatError::InvalidAudio(_) => ApiError::BadRequest(err.to_string()),
            ChatError::InvalidImage(ImageError::Empty) => ApiError::BadRequest(err.to_string()),
            ChatError::InvalidImage(_) => ApiError::UnsupportedMediaType(err.to_string()),
            ChatError::SessionNotFound(_) => ApiError::NotFound(err.to_string()),
            ChatError::TurnInFlight
            | ChatError::InvalidTransition { .. }
            | ChatError::CredentialsManaged => ApiError::Conflict(err.to_string()),
            ChatError::CredentialsMissing => ApiError::PreconditionFailed(err.to_string()),
            ChatError::Transcription(_) => ApiError::UnprocessableEntity(err.to_string()),
            ChatError::Gateway(_) => ApiError::BadGateway(err.to_string()),
            ChatError::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AibrewError> for ApiError {
    fn from(err: AibrewError) -> Self {
        match &err {
            AibrewError::Config(msg) => ApiError::BadRequest(msg.clone()),
            AibrewError::PayloadTooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(format!("Invalid multipart request: {}", rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            ApiError::Internal(rejection.body_text())
        } else {
            ApiError::BadRequest(format!("Invalid path: {}", rejection.body_text()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aibrew_core::types::ImageFormat;
    use aibrew_gateway::GatewayError;
    use aibrew_speech::TranscriptionError;

    fn status_of(err: ChatError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_chat_error_status_mapping() {
        assert_eq!(status_of(ChatError::EmptyMessage), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ChatError::MessageTooLong(2000)), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ChatError::TurnInFlight), StatusCode::CONFLICT);
        assert_eq!(
            status_of(ChatError::CredentialsMissing),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            status_of(ChatError::SessionNotFound(uuid::Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ChatError::Transcription(TranscriptionError::EmptyTranscript)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ChatError::Gateway(GatewayError::EmptyReply)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ChatError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_image_errors() {
        assert_eq!(
            status_of(ChatError::InvalidImage(ImageError::UnsupportedType("gif".into()))),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status_of(ChatError::InvalidImage(ImageError::FormatMismatch(ImageFormat::Png))),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status_of(ChatError::InvalidImage(ImageError::Empty)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_payload_too_large_from_core() {
        let err: ApiError = AibrewError::PayloadTooLarge {
            size: 20,
            limit: 10,
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
