//! Outbound PCM encoding
//!
//! Pure transform from captured float blocks to the wire format: 16-bit
//! signed little-endian PCM, one chunk per block, no buffering or
//! coalescing across blocks.

use bytes::{BufMut, Bytes, BytesMut};

use crate::audio::frame::AudioFrame;
use crate::constants::CAPTURE_MIME_TYPE;

/// Encoded outbound payload with its format tag.
///
/// Immutable once built; ownership moves into the transport on send.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub payload: Bytes,
    pub mime_type: &'static str,
}

impl EncodedChunk {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Float-to-PCM16 encoder
pub struct PcmEncoder;

impl PcmEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode one block: `round(s * 32768)` per sample, saturated to the
    /// i16 range, packed little-endian.
    pub fn encode(&self, frame: &AudioFrame) -> EncodedChunk {
        let mut payload = BytesMut::with_capacity(frame.samples.len() * 2);

        for &sample in &frame.samples {
            let scaled = (sample * 32768.0).round();
            let value = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            payload.put_i16_le(value);
        }

        EncodedChunk {
            payload: payload.freeze(),
            mime_type: CAPTURE_MIME_TYPE,
        }
    }
}

impl Default for PcmEncoder {
    fn default() -> Self {
        Self::new()
    }
}
