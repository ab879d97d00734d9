//! Captured audio blocks and fixed-size block assembly

/// A fixed-length block of normalized audio samples
#[derive(Clone)]
pub struct AudioFrame {
    /// Interleaved samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Get number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Get frame duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples_per_channel() as f64 / self.sample_rate as f64
    }
}

/// Assembles variable-length hardware callback buffers into fixed-size
/// blocks.
///
/// The device delivers whatever buffer size it negotiated; the transport
/// expects exact blocks. Samples carry over between calls, so blocks are
/// emitted in capture order with nothing dropped.
pub struct FrameChunker {
    block_size: usize,
    sample_rate: u32,
    channels: u16,
    pending: Vec<f32>,
}

impl FrameChunker {
    pub fn new(block_size: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            block_size,
            sample_rate,
            channels,
            pending: Vec::with_capacity(block_size * 2),
        }
    }

    /// Append captured samples, emitting one frame per completed block
    pub fn push(&mut self, samples: &[f32], mut emit: impl FnMut(AudioFrame)) {
        self.pending.extend_from_slice(samples);

        while self.pending.len() >= self.block_size {
            let block: Vec<f32> = self.pending.drain(..self.block_size).collect();
            emit(AudioFrame::new(block, self.sample_rate, self.channels));
        }
    }

    /// Samples waiting for the next block boundary
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration() {
        let frame = AudioFrame::new(vec![0.0; 4096], 16000, 1);
        assert_eq!(frame.samples_per_channel(), 4096);
        assert!((frame.duration() - 0.256).abs() < 1e-9);
    }

    #[test]
    fn test_chunker_emits_exact_blocks() {
        let mut chunker = FrameChunker::new(4096, 16000, 1);
        let mut emitted = Vec::new();

        // 4096 + 2048 yields one block with 2048 pending
        chunker.push(&vec![0.25; 6144], |f| emitted.push(f));
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].samples.len(), 4096);
        assert_eq!(chunker.pending_len(), 2048);

        // next 2048 completes the second block
        chunker.push(&vec![0.5; 2048], |f| emitted.push(f));
        assert_eq!(emitted.len(), 2);
        assert_eq!(chunker.pending_len(), 0);
    }

    #[test]
    fn test_chunker_preserves_order() {
        let mut chunker = FrameChunker::new(4, 16000, 1);
        let input: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let mut emitted = Vec::new();

        chunker.push(&input, |f| emitted.push(f));

        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].samples, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(emitted[1].samples, vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(chunker.pending_len(), 2);
    }
}
