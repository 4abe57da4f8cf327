//! Minimal RIFF/WAVE handling for recorded voice clips.
//!
//! Clips are passed through to the transcription service untouched; this
//! module only checks that an upload really is a PCM WAV container and
//! reports its shape. `encode_pcm16` produces clips for tests and tooling.

use bytes::Bytes;

use crate::TranscriptionError;

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const PCM_FORMAT_TAG: u16 = 1;

/// Shape of a parsed WAV clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Length of the `data` chunk in bytes.
    pub data_len: u32,
}

impl WavInfo {
    /// Parse the RIFF header and locate the `fmt ` and `data` chunks.
    pub fn parse(bytes: &[u8]) -> Result<Self, TranscriptionError> {
        if bytes.len() < RIFF_HEADER_LEN || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(TranscriptionError::InvalidAudio(
                "missing RIFF/WAVE header".to_string(),
            ));
        }

        let mut fmt: Option<(u16, u16, u32, u16)> = None;
        let mut data_len: Option<u32> = None;
        let mut offset = RIFF_HEADER_LEN;

        while offset + CHUNK_HEADER_LEN <= bytes.len() {
            let id = &bytes[offset..offset + 4];
            let size = read_u32(bytes, offset + 4);
            let body = offset + CHUNK_HEADER_LEN;

            match id {
                b"fmt " => {
                    if size < 16 || body + 16 > bytes.len() {
                        return Err(TranscriptionError::InvalidAudio(
                            "truncated fmt chunk".to_string(),
                        ));
                    }
                    fmt = Some((
                        read_u16(bytes, body),
                        read_u16(bytes, body + 2),
                        read_u32(bytes, body + 4),
                        read_u16(bytes, body + 14),
                    ));
                }
                b"data" => {
                    if body + size as usize > bytes.len() {
                        return Err(TranscriptionError::InvalidAudio(
                            "truncated data chunk".to_string(),
                        ));
                    }
                    data_len = Some(size);
                    break;
                }
                _ => {}
            }

            // Chunks are word-aligned.
            offset = body + size as usize + (size as usize & 1);
        }

        let (format_tag, channels, sample_rate, bits_per_sample) = fmt.ok_or_else(|| {
            TranscriptionError::InvalidAudio("missing fmt chunk".to_string())
        })?;
        let data_len = data_len
            .ok_or_else(|| TranscriptionError::InvalidAudio("missing data chunk".to_string()))?;

        if format_tag != PCM_FORMAT_TAG {
            return Err(TranscriptionError::InvalidAudio(format!(
                "unsupported WAV format tag {}",
                format_tag
            )));
        }
        if channels == 0 || sample_rate == 0 || bits_per_sample == 0 {
            return Err(TranscriptionError::InvalidAudio(
                "zero channels, sample rate or sample width".to_string(),
            ));
        }

        Ok(Self {
            channels,
            sample_rate,
            bits_per_sample,
            data_len,
        })
    }

    /// Clip length in seconds.
    pub fn duration_secs(&self) -> f32 {
        let bytes_per_sec =
            self.sample_rate as f32 * self.channels as f32 * (self.bits_per_sample as f32 / 8.0);
        self.data_len as f32 / bytes_per_sec
    }
}

/// A validated WAV clip ready to be shipped to the transcription service.
#[derive(Debug, Clone)]
pub struct AudioClip {
    bytes: Bytes,
    info: WavInfo,
}

impl AudioClip {
    pub fn from_wav(bytes: Bytes) -> Result<Self, TranscriptionError> {
        let info = WavInfo::parse(&bytes)?;
        Ok(Self { bytes, info })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn info(&self) -> WavInfo {
        self.info
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.info.data_len == 0
    }
}

/// Encode 16-bit PCM samples as a WAV file.
pub fn encode_pcm16(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let block_align = channels * 2;
    let byte_rate = sample_rate * block_align as u32;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
