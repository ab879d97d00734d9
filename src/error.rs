//! Error types for the voice streaming session

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Microphone capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Input device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open input stream: {0}")]
    Stream(String),

    #[error("Unsupported capture format: {0}")]
    UnsupportedFormat(String),
}

/// Speaker playback errors
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Output device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open output stream: {0}")]
    Stream(String),
}

/// PCM conversion errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed PCM payload: {0}")]
    MalformedPayload(String),
}

/// Remote transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open transport: {0}")]
    Connect(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Socket error: {0}")]
    Socket(String),
}

/// Session lifecycle errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A session is already connecting or connected")]
    AlreadyActive,
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
