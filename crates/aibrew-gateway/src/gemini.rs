//! Gemini `generateContent` client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use aibrew_core::config::GatewayConfig;
use aibrew_core::types::{ContentPart, TurnContents};

use crate::{GatewayError, ModelGateway};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn build_request(contents: &TurnContents) -> GenerateContentRequest {
    let parts = contents
        .parts()
        .into_iter()
        .map(|part| match part {
            ContentPart::Text(text) => RequestPart::Text { text },
            ContentPart::Image(image) => RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type(),
                    data: BASE64.encode(&image.data),
                },
            },
        })
        .collect();

    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts,
        }],
    }
}

/// Finish reasons meaning the model refused rather than ran out of output.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

fn extract_reply(response: GenerateContentResponse) -> Result<String, GatewayError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => Err(GatewayError::Blocked(reason)),
            None => Err(GatewayError::EmptyReply),
        };
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        if let Some(reason) = candidate
            .finish_reason
            .filter(|r| BLOCKING_FINISH_REASONS.contains(&r.as_str()))
        {
            return Err(GatewayError::Blocked(reason));
        }
        return Err(GatewayError::EmptyReply);
    }
    Ok(text)
}

fn error_message(body: String) -> String {
    serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

// =============================================================================
// Client
// =============================================================================

/// HTTP client for Gemini's `generateContent` endpoint.
pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: String,
    settings: GeminiSettings,
}

impl GeminiGateway {
    pub fn new(api_key: impl Into<String>, settings: GeminiSettings) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            settings,
        })
    }

    pub fn settings(&self) -> &GeminiSettings {
        &self.settings
    }
}

impl fmt::Debug for GeminiGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiGateway")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn reply(&self, contents: &TurnContents) -> Result<String, GatewayError> {
        tracing::debug!(
            model = %self.settings.model,
            text_len = contents.text().len(),
            has_image = contents.image().is_some(),
            "Sending turn to model"
        );

        let response = self
            .client
            .post(self.settings.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&build_request(contents))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Model request rejected");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: error_message(body),
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        extract_reply(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aibrew_core::types::ImageAttachment;
    use serde_json::json;

    fn png() -> ImageAttachment {
        let data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        ImageAttachment::from_upload("cat.png", data.into()).unwrap()
    }

    #[test]
    fn test_endpoint() {
        let settings = GeminiSettings {
            base_url: "https://example.test/".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(
            settings.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_text_only() {
        let body = serde_json::to_value(build_request(&TurnContents::new("hi", None))).unwrap();
        assert_eq!(
            body,
            json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn test_request_with_image() {
        let body =
            serde_json::to_value(build_request(&TurnContents::new("What?", Some(png())))).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "What?");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "iVBORw0KGgo=");
    }

    #[test]
    fn test_extract_reply_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "A "}, {"text": "cat."}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_reply(response).unwrap(), "A cat.");
    }

    #[test]
    fn test_extract_reply_blocked_prompt() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        match extract_reply(response).unwrap_err() {
            GatewayError::Blocked(reason) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_reply_empty_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "STOP"}]
        }))
        .unwrap();
        assert!(matches!(
            extract_reply(response),
            Err(GatewayError::EmptyReply)
        ));
    }

    #[test]
    fn test_extract_reply_candidate_stopped_for_safety() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert!(matches!(
            extract_reply(response),
            Err(GatewayError::Blocked(r)) if r == "SAFETY"
        ));
    }

    #[test]
    fn test_extract_reply_max_tokens_without_text_is_empty_not_blocked() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]
        }))
        .unwrap();
        assert!(matches!(
            extract_reply(response),
            Err(GatewayError::EmptyReply)
        ));
    }

    #[test]
    fn test_extract_reply_recitation_is_blocked() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "RECITATION"}]
        }))
        .unwrap();
        assert!(matches!(
            extract_reply(response),
            Err(GatewayError::Blocked(r)) if r == "RECITATION"
        ));
    }

    #[test]
    fn test_extract_reply_no_candidates_without_feedback_is_empty() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            extract_reply(response),
            Err(GatewayError::EmptyReply)
        ));
    }

    #[test]
    fn test_error_message_prefers_api_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body.to_string()), "API key not valid");
        assert_eq!(error_message("plain".to_string()), "plain");
    }
}
