//! Linear PCM conversion
//!
//! Pure transforms between normalized float blocks and the 16-bit signed
//! little-endian wire format, in both directions.

pub mod decoder;
pub mod encoder;

pub use decoder::{InboundSegment, PcmDecoder};
pub use encoder::{EncodedChunk, PcmEncoder};
