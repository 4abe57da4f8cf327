//! Acceptance rules for recorded voice clips.

use aibrew_core::config::TranscriptionConfig;
use aibrew_speech::AudioClip;

use crate::error::ChatError;

/// Slack allowed on top of the fixed recording window.
const DURATION_TOLERANCE_SECS: f32 = 1.0;

/// Shape a browser recording must have before it is sent for transcription:
/// mono 16-bit PCM at the configured sample rate, non-empty, and no longer
/// than the recording window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceProfile {
    pub sample_rate: u32,
    pub record_seconds: u32,
}

impl VoiceProfile {
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            record_seconds: config.record_seconds,
        }
    }

    pub fn check(&self, clip: &AudioClip) -> Result<(), ChatError> {
        let info = clip.info();
        if clip.is_empty() {
            return Err(ChatError::InvalidAudio("recording contains no samples".into()));
        }
        if info.channels != 1 {
            return Err(ChatError::InvalidAudio(format!(
                "expected mono audio, got {} channels",
                info.channels
            )));
        }
        if info.bits_per_sample != 16 {
            return Err(ChatError::InvalidAudio(format!(
                "expected 16-bit samples, got {}-bit",
                info.bits_per_sample
            )));
        }
        if info.sample_rate != self.sample_rate {
            return Err(ChatError::InvalidAudio(format!(
                "expected {} Hz, got {} Hz",
                self.sample_rate, info.sample_rate
            )));
        }
        let limit = self.record_seconds as f32 + DURATION_TOLERANCE_SECS;
        if info.duration_secs() > limit {
            return Err(ChatError::InvalidAudio(format!(
                "recording is {:.1}s, limit is {}s",
                info.duration_secs(),
                self.record_seconds
            )));
        }
        Ok(())
    }
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self::from_config(&TranscriptionConfig::default())
    }
}
