//! Inbound PCM decoding

use crate::error::CodecError;

/// Decoded reply audio, scoped to one scheduled playback
#[derive(Debug, Clone)]
pub struct InboundSegment {
    /// Interleaved normalized samples
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl InboundSegment {
    /// Frames per channel
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Segment duration in seconds
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Collapse interleaved channels to mono by averaging
    pub fn into_mono(self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples;
        }
        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// PCM16 little-endian decoder, fixed to the rate and channel count the
/// endpoint synthesizes at
pub struct PcmDecoder {
    sample_rate: u32,
    channels: u16,
}

impl PcmDecoder {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Decode a received payload into a playback segment.
    ///
    /// A payload that is empty or not whole 16-bit frames is malformed; the
    /// caller skips the segment and the session continues.
    pub fn decode(&self, data: &[u8]) -> Result<InboundSegment, CodecError> {
        if data.is_empty() {
            return Err(CodecError::MalformedPayload("empty payload".to_string()));
        }

        let frame_bytes = 2 * self.channels as usize;
        if data.len() % frame_bytes != 0 {
            return Err(CodecError::MalformedPayload(format!(
                "{} bytes is not whole {}-byte frames",
                data.len(),
                frame_bytes
            )));
        }

        let samples: Vec<f32> = data
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
            .collect();

        Ok(InboundSegment {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
