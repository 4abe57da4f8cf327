//! Sarvam speech-to-text client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;

use aibrew_core::config::TranscriptionConfig;

use crate::wav::AudioClip;
use crate::{non_empty_transcript, TranscriptionError, TranscriptionService};

const API_KEY_HEADER: &str = "api-subscription-key";
const CLIP_FILE_NAME: &str = "recording.wav";

/// Request parameters sent with every clip.
#[derive(Debug, Clone)]
pub struct SarvamSettings {
    pub endpoint: String,
    pub language_code: String,
    pub model: String,
    pub with_timestamps: bool,
    pub timeout: Duration,
}

impl SarvamSettings {
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            language_code: config.language_code.clone(),
            model: config.model.clone(),
            with_timestamps: config.with_timestamps,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SarvamResponse {
    #[serde(default)]
    transcript: Option<String>,
}

/// HTTP client for the Sarvam speech-to-text endpoint.
pub struct SarvamTranscriber {
    client: reqwest::Client,
    api_key: String,
    settings: SarvamSettings,
}

impl SarvamTranscriber {
    pub fn new(
        api_key: impl Into<String>,
        settings: SarvamSettings,
    ) -> Result<Self, TranscriptionError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            settings,
        })
    }

    pub fn settings(&self) -> &SarvamSettings {
        &self.settings
    }

    fn form(&self, clip: &AudioClip) -> Result<Form, TranscriptionError> {
        let file = Part::bytes(clip.bytes().to_vec())
            .file_name(CLIP_FILE_NAME)
            .mime_str("audio/wav")?;
        let with_timestamps = if self.settings.with_timestamps {
            "true"
        } else {
            "false"
        };

        Ok(Form::new()
            .part("file", file)
            .text("language_code", self.settings.language_code.clone())
            .text("model", self.settings.model.clone())
            .text("with_timestamps", with_timestamps))
    }
}

impl fmt::Debug for SarvamTranscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SarvamTranscriber")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TranscriptionService for SarvamTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscriptionError> {
        tracing::debug!(
            endpoint = %self.settings.endpoint,
            bytes = clip.len(),
            duration_secs = clip.info().duration_secs(),
            "Sending clip to speech-to-text"
        );

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .multipart(self.form(clip)?)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Speech-to-text request rejected");
            return Err(TranscriptionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: SarvamResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Decode(e.to_string()))?;

        non_empty_transcript(body.transcript)
    }
}
