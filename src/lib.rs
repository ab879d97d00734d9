//! # Live Voice Streamer
//!
//! Real-time duplex voice streaming against a speech-capable inference
//! endpoint: microphone capture, PCM encoding, a bidirectional streaming
//! transport, gapless reply playback, and barge-in interruption handling.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            VOICE SESSION                             │
//! │                                                                      │
//! │  ┌────────────┐    ┌─────────────┐    ┌──────────────────────────┐   │
//! │  │ Microphone │───▶│ FrameChunker│───▶│ PcmEncoder               │   │
//! │  │ (cpal)     │    │ 4096-sample │    │ f32 → LE i16, pcm@16000  │   │
//! │  └────────────┘    │ blocks      │    └────────────┬─────────────┘   │
//! │                    └─────────────┘                 │ send            │
//! │                                                    ▼                 │
//! │                                     ┌──────────────────────────┐     │
//! │                                     │ Transport (WebSocket)    │     │
//! │                                     │ duplex JSON + base64 PCM │     │
//! │                                     └────────────┬─────────────┘     │
//! │                                                  │ events            │
//! │       Opened / AudioSegment / Interrupted / Closed / Error           │
//! │                                                  │                   │
//! │  ┌────────────┐    ┌──────────────────┐          ▼                   │
//! │  │ Speakers   │◀───│ PlaybackScheduler│◀──── event loop              │
//! │  │ (cpal)     │    │ gapless cursor,  │      (single task)           │
//! │  └────────────┘    │ active set,      │                              │
//! │                    │ barge-in reset   │                              │
//! │                    └──────────────────┘                              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use config::{AudioConfig, ResponseModality, SessionConfig};
pub use error::{Error, Result};
pub use session::{SessionState, VoiceSession};

/// Application-wide constants
pub mod constants {
    /// Sample rate the endpoint accepts for microphone audio
    pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

    /// Sample rate the endpoint synthesizes reply audio at
    pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

    /// Channel count for both legs (mono)
    pub const CHANNELS: u16 = 1;

    /// Samples per outbound block
    pub const CAPTURE_BLOCK_SIZE: usize = 4096;

    /// MIME tag attached to every outbound chunk
    pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

    /// Default model identifier
    pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-12-2025";

    /// Default prebuilt voice name
    pub const DEFAULT_VOICE: &str = "Puck";
}
