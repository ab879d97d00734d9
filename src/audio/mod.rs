//! Audio subsystem module

pub mod backend;
pub mod capture;
pub mod device;
pub mod frame;
pub mod playback;

pub use backend::{AudioBackend, CpalBackend};
pub use capture::{CaptureSource, MicSource};
pub use frame::{AudioFrame, FrameChunker};
pub use playback::{AudioPlayback, PlaybackHandle, PlaybackId, PlaybackSink};
