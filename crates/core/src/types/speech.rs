//! Speech synthesis request/response types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::language::Language;
use crate::service::ProviderId;

/// Audio container the provider should emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Ogg,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
        }
    }
}

/// Speech synthesis request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechRequest {
    /// Text to speak
    pub text: String,
    /// Voice to use; provider default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    /// Narration language
    pub language: Language,
    /// Speaking rate multiplier (1.0 = normal)
    pub rate: f32,
    /// Pitch shift in semitones
    pub pitch: f32,
    /// Volume multiplier (1.0 = normal)
    pub volume: f32,
    /// Output container
    pub output_format: AudioFormat,
    /// Destination path; the driver derives this from the session layout
    /// so re-issued requests are idempotent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            voice_id: None,
            language,
            rate: 1.0,
            pitch: 0.0,
            volume: 1.0,
            output_format: AudioFormat::Wav,
            output_path: None,
        }
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

/// Speech synthesis response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechResponse {
    /// Where the audio landed on disk
    pub audio_path: PathBuf,
    /// Measured duration in seconds
    pub duration_s: f64,
    /// Sample rate of the produced audio
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Provider that served the request
    pub provider: ProviderId,
}

/// Voice gender hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Male,
    Female,
    Neutral,
}

/// A voice offered by a speech provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<VoiceGender>,
}
