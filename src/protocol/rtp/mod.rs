//! RTP ingress wire format.

pub mod extension;
pub mod packet;

pub use extension::LatencyExtension;
pub use packet::{RtpDecodeError, RtpExtension, RtpHeader, RtpPacket};

use crate::types::config::{CameraResolution, Codec};

/// RTP clock rate of the video streams.
pub const VIDEO_CLOCK_RATE: u32 = 90_000;

/// Capabilities a stream is expected to match.
///
/// Mirrors the caps filter the sender negotiates against: only
/// `encoding-name`, `payload` and `x-dimensions` vary per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpCaps {
    /// RTP encoding name, e.g. `JPEG`.
    pub encoding_name: &'static str,
    /// Expected payload type number.
    pub payload_type: u8,
    /// Media clock rate in Hz.
    pub clock_rate: u32,
    /// Frame dimensions `(width, height)`.
    pub dimensions: (u32, u32),
}

impl RtpCaps {
    /// Caps for a configured stream.
    #[must_use]
    pub fn for_stream(codec: Codec, resolution: &CameraResolution) -> Self {
        Self {
            encoding_name: codec.encoding_name(),
            payload_type: codec.payload_type(),
            clock_rate: VIDEO_CLOCK_RATE,
            dimensions: (resolution.width, resolution.height),
        }
    }

    /// Whether a packet header matches these caps.
    #[must_use]
    pub fn accepts(&self, header: &RtpHeader) -> bool {
        header.payload_type == self.payload_type
    }
}

impl std::fmt::Display for RtpCaps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "application/x-rtp, media=video, encoding-name={}, payload={}, clock-rate={}, x-dimensions=\"{},{}\"",
            self.encoding_name, self.payload_type, self.clock_rate,
            self.dimensions.0, self.dimensions.1,
        )
    }
}

#[cfg(test)]
mod tests;
