//! Decoded-frame handling.
//!
//! The renderer owns nothing here but reads everything: the ingest
//! pipelines keep the [`FramePair`] current and the renderer samples it
//! once per displayed frame. Frames are opaque RGB byte buffers; codec
//! work happens behind the [`VideoDecoder`] seam.

pub mod decoder;
pub mod frame;

pub use decoder::{DecodeError, DecoderFactory, RawRgbDecoder, VideoDecoder, raw_rgb_factory};
pub use frame::{Eye, FrameBuffer, FramePair, FrameSink, GpuTexture};
