//! Session and audio pipeline configuration

use serde::{Deserialize, Serialize};

use crate::constants::{
    CAPTURE_BLOCK_SIZE, CAPTURE_SAMPLE_RATE, CHANNELS, DEFAULT_MODEL, DEFAULT_VOICE,
    PLAYBACK_SAMPLE_RATE,
};

/// Fixed audio pipeline parameters.
///
/// The outbound leg always runs at the capture rate and the inbound leg at
/// the playback rate; both are mono. These are separate fields rather than
/// one rate because the remote endpoint synthesizes at a higher rate than it
/// accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Microphone sample rate in Hz
    pub capture_sample_rate: u32,

    /// Reply audio sample rate in Hz
    pub playback_sample_rate: u32,

    /// Channel count for both legs
    pub channels: u16,

    /// Samples per captured block
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_sample_rate: CAPTURE_SAMPLE_RATE,
            playback_sample_rate: PLAYBACK_SAMPLE_RATE,
            channels: CHANNELS,
            block_size: CAPTURE_BLOCK_SIZE,
        }
    }
}

/// Modality requested for model responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Audio,
}

impl ResponseModality {
    /// Wire name used in the setup message
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "AUDIO",
        }
    }
}

/// Per-session configuration sent to the remote endpoint on open
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Model identifier
    pub model: String,

    /// Prebuilt voice name for synthesized replies
    pub voice: String,

    /// System instruction establishing the assistant's role
    pub system_prompt: String,

    /// Response modality; audio is the only supported value
    pub response_modality: ResponseModality,
}

impl SessionConfig {
    /// Build a config with the default model and voice
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            system_prompt: String::new(),
            response_modality: ResponseModality::Audio,
        }
    }
}
