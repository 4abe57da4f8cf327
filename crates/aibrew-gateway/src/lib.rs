//! Model gateway: sends a turn's text and optional image to the generative
//! model and returns its text reply.

pub mod gemini;

use std::sync::Mutex;

use async_trait::async_trait;

use aibrew_core::error::AibrewError;
use aibrew_core::types::TurnContents;

pub use gemini::{GeminiGateway, GeminiSettings};

/// Errors from the model gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("prompt was blocked: {0}")]
    Blocked(String),
    #[error("model returned no text")]
    EmptyReply,
    #[error("could not decode model response: {0}")]
    Decode(String),
}

impl From<GatewayError> for AibrewError {
    fn from(err: GatewayError) -> Self {
        AibrewError::Gateway(err.to_string())
    }
}

/// Generative model producing a text reply for one turn.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn reply(&self, contents: &TurnContents) -> Result<String, GatewayError>;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock gateway that echoes the turn back.
///
/// Every request is recorded so tests can check what reached the model,
/// including whether the session image was attached.
#[derive(Debug, Default)]
pub struct MockGateway {
    failure: Option<(u16, String)>,
    requests: Mutex<Vec<TurnContents>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose every call fails with `status`.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self {
            failure: Some((status, body.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<TurnContents> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// The reply this mock produces for `contents`.
    pub fn echo(contents: &TurnContents) -> String {
        match contents.image() {
            Some(image) => format!("Echo: {} [image: {}]", contents.text(), image.file_name),
            None => format!("Echo: {}", contents.text()),
        }
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn reply(&self, contents: &TurnContents) -> Result<String, GatewayError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(contents.clone());
        }
        if let Some((status, body)) = &self.failure {
            return Err(GatewayError::Status {
                status: *status,
                body: body.clone(),
            });
        }
        Ok(Self::echo(contents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aibrew_core::types::ImageAttachment;

    fn png() -> ImageAttachment {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0; 8]);
        ImageAttachment::from_upload("cat.png", data.into()).unwrap()
    }

    #[tokio::test]
    async fn test_mock_echoes_text() {
        let gateway = MockGateway::new();
        let reply = gateway
            .reply(&TurnContents::new("hello", None))
            .await
            .unwrap();
        assert_eq!(reply, "Echo: hello");
    }

    #[tokio::test]
    async fn test_mock_mentions_image() {
        let gateway = MockGateway::new();
        let reply = gateway
            .reply(&TurnContents::new("What is this?", Some(png())))
            .await
            .unwrap();
        assert_eq!(reply, "Echo: What is this? [image: cat.png]");
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let gateway = MockGateway::new();
        gateway.reply(&TurnContents::new("one", None)).await.unwrap();
        gateway
            .reply(&TurnContents::new("two", Some(png())))
            .await
            .unwrap();

        let requests = gateway.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].image().is_none());
        assert_eq!(requests[1].image().map(|i| i.file_name.as_str()), Some("cat.png"));
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let gateway = MockGateway::failing(429, "quota");
        let err = gateway
            .reply(&TurnContents::new("hi", None))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "model API returned 429: quota");
        assert_eq!(gateway.requests().len(), 1);
    }
}
