//! Decoder seam.
//!
//! Concrete codec implementations live outside this crate; the pipeline
//! only relies on the contract that one access unit in yields one
//! `width * height * 3` RGB buffer out.

use std::sync::Arc;

use crate::types::config::{CameraResolution, Codec};

/// Errors from a decoder implementation.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Access unit could not be decoded.
    #[error("malformed access unit: {0}")]
    Malformed(String),

    /// Decoder produced a frame of the wrong size.
    #[error("decoder produced {got} bytes, expected {expected}")]
    WrongSize {
        /// Bytes the frame contract requires.
        expected: usize,
        /// Bytes the decoder produced.
        got: usize,
    },
}

/// Decodes access units into RGB frames.
pub trait VideoDecoder: Send {
    /// Decode one access unit into an RGB buffer of exactly
    /// `width * height * 3` bytes.
    ///
    /// # Errors
    /// Returns `DecodeError` on malformed input; the pipeline treats
    /// this as a runtime fault and tears down.
    fn decode(&mut self, access_unit: &[u8]) -> Result<Vec<u8>, DecodeError>;
}

/// Selects a decoder for a configured stream.
pub type DecoderFactory =
    Arc<dyn Fn(Codec, &CameraResolution) -> Box<dyn VideoDecoder> + Send + Sync>;

/// Passthrough decoder for pre-decoded RGB streams and tests.
///
/// Copies the access unit into a zeroed frame-sized buffer, truncating
/// oversized input, so the output size contract always holds.
#[derive(Debug)]
pub struct RawRgbDecoder {
    frame_bytes: usize,
}

impl RawRgbDecoder {
    /// Create for one frame geometry.
    #[must_use]
    pub fn new(resolution: &CameraResolution) -> Self {
        Self { frame_bytes: resolution.frame_bytes() }
    }
}

impl VideoDecoder for RawRgbDecoder {
    fn decode(&mut self, access_unit: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut frame = vec![0u8; self.frame_bytes];
        let n = access_unit.len().min(self.frame_bytes);
        frame[..n].copy_from_slice(&access_unit[..n]);
        Ok(frame)
    }
}

/// Factory producing [`RawRgbDecoder`] for every codec. The default
/// until a real codec backend is plugged in.
#[must_use]
pub fn raw_rgb_factory() -> DecoderFactory {
    Arc::new(|_codec, resolution| Box::new(RawRgbDecoder::new(resolution)))
}
