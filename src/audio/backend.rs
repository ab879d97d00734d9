//! Audio backend seam
//!
//! The session acquires its capture source and playback sink per start, so
//! the backend is a factory trait rather than a pair of long-lived objects.
//! Tests inject a backend that needs no hardware.

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::audio::capture::{CaptureSource, MicSource};
use crate::audio::playback::{AudioPlayback, PlaybackId, PlaybackSink};
use crate::config::AudioConfig;
use crate::error::{CaptureError, PlaybackError};

/// Factory for the two device-facing halves of a session
pub trait AudioBackend: Send + Sync {
    /// Acquire the capture device; fails before any transport interaction
    fn open_capture(&self, audio: &AudioConfig) -> Result<Box<dyn CaptureSource>, CaptureError>;

    /// Acquire the output device; completions report on `done_tx`
    fn open_playback(
        &self,
        audio: &AudioConfig,
        done_tx: UnboundedSender<PlaybackId>,
    ) -> Result<Arc<dyn PlaybackSink>, PlaybackError>;
}

/// Default-device backend via cpal
#[derive(Default)]
pub struct CpalBackend;

impl AudioBackend for CpalBackend {
    fn open_capture(&self, audio: &AudioConfig) -> Result<Box<dyn CaptureSource>, CaptureError> {
        Ok(Box::new(MicSource::open(audio)?))
    }

    fn open_playback(
        &self,
        audio: &AudioConfig,
        done_tx: UnboundedSender<PlaybackId>,
    ) -> Result<Arc<dyn PlaybackSink>, PlaybackError> {
        Ok(Arc::new(AudioPlayback::open(audio, done_tx)?))
    }
}
