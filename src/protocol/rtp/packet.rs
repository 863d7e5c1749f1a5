//! RTP packet codec.

use bytes::{Bytes, BytesMut};
use thiserror::Error;

/// Errors from RTP packet decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RtpDecodeError {
    /// Buffer too small for the claimed layout.
    #[error("buffer too small: needed {needed}, have {have}")]
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        have: usize,
    },

    /// Version field was not 2.
    #[error("invalid RTP version: {0}")]
    InvalidVersion(u8),

    /// Padding length exceeds the payload.
    #[error("invalid padding length: {0}")]
    InvalidPadding(u8),
}

/// RTP fixed header (12 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeader {
    /// Version (always 2).
    pub version: u8,
    /// Padding flag.
    pub padding: bool,
    /// Extension flag.
    pub extension: bool,
    /// CSRC count (4 bits).
    pub csrc_count: u8,
    /// Marker bit; set on the last packet of a frame.
    pub marker: bool,
    /// Payload type (7 bits). Dynamic for video, so kept raw.
    pub payload_type: u8,
    /// Sequence number.
    pub sequence: u16,
    /// Media timestamp.
    pub timestamp: u32,
    /// Synchronization source.
    pub ssrc: u32,
}

impl RtpHeader {
    /// Fixed header size.
    pub const SIZE: usize = 12;

    /// Header for an outbound video packet. Only exercised by the test
    /// sender; the crate itself is ingress-only.
    #[must_use]
    pub fn new_video(payload_type: u8, sequence: u16, timestamp: u32, ssrc: u32) -> Self {
        Self {
            version: 2,
            padding: false,
            extension: false,
            csrc_count: 0,
            marker: false,
            payload_type,
            sequence,
            timestamp,
            ssrc,
        }
    }

    /// Encode to bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; 12] {
        let mut buf = [0u8; 12];
        buf[0] = (self.version << 6)
            | (u8::from(self.padding) << 5)
            | (u8::from(self.extension) << 4)
            | (self.csrc_count & 0x0F);
        buf[1] = (u8::from(self.marker) << 7) | (self.payload_type & 0x7F);
        buf[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        buf
    }

    /// Decode from bytes.
    ///
    /// # Errors
    /// Returns `RtpDecodeError` on short buffers or a bad version.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpDecodeError> {
        if buf.len() < Self::SIZE {
            return Err(RtpDecodeError::BufferTooSmall {
                needed: Self::SIZE,
                have: buf.len(),
            });
        }

        let version = (buf[0] >> 6) & 0x03;
        if version != 2 {
            return Err(RtpDecodeError::InvalidVersion(version));
        }

        Ok(Self {
            version,
            padding: (buf[0] >> 5) & 0x01 != 0,
            extension: (buf[0] >> 4) & 0x01 != 0,
            csrc_count: buf[0] & 0x0F,
            marker: (buf[1] >> 7) & 0x01 != 0,
            payload_type: buf[1] & 0x7F,
            sequence: u16::from_be_bytes([buf[2], buf[3]]),
            timestamp: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ssrc: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }
}

/// Raw RTP header extension block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpExtension {
    /// The 16-bit "defined by profile" word.
    pub profile: u16,
    /// Extension payload, excluding the 4-byte extension header.
    pub data: Bytes,
}

/// A decoded RTP packet.
#[derive(Debug, Clone)]
pub struct RtpPacket {
    /// Fixed header.
    pub header: RtpHeader,
    /// Header extension block, if the X bit was set.
    pub extension: Option<RtpExtension>,
    /// Media payload with padding stripped.
    pub payload: Bytes,
}

impl RtpPacket {
    /// Decode a datagram into a packet.
    ///
    /// # Errors
    /// Returns `RtpDecodeError` when the layout claims more bytes than
    /// the datagram holds.
    pub fn decode(datagram: Bytes) -> Result<Self, RtpDecodeError> {
        let header = RtpHeader::decode(&datagram)?;

        let mut offset = RtpHeader::SIZE + usize::from(header.csrc_count) * 4;
        if datagram.len() < offset {
            return Err(RtpDecodeError::BufferTooSmall {
                needed: offset,
                have: datagram.len(),
            });
        }

        let extension = if header.extension {
            if datagram.len() < offset + 4 {
                return Err(RtpDecodeError::BufferTooSmall {
                    needed: offset + 4,
                    have: datagram.len(),
                });
            }
            let profile = u16::from_be_bytes([datagram[offset], datagram[offset + 1]]);
            let words = usize::from(u16::from_be_bytes([
                datagram[offset + 2],
                datagram[offset + 3],
            ]));
            let data_start = offset + 4;
            let data_end = data_start + words * 4;
            if datagram.len() < data_end {
                return Err(RtpDecodeError::BufferTooSmall {
                    needed: data_end,
                    have: datagram.len(),
                });
            }
            offset = data_end;
            Some(RtpExtension {
                profile,
                data: datagram.slice(data_start..data_end),
            })
        } else {
            None
        };

        let mut payload_end = datagram.len();
        if header.padding {
            let pad = datagram[payload_end - 1];
            if pad == 0 || usize::from(pad) > payload_end - offset {
                return Err(RtpDecodeError::InvalidPadding(pad));
            }
            payload_end -= usize::from(pad);
        }

        Ok(Self {
            header,
            extension,
            payload: datagram.slice(offset..payload_end),
        })
    }

    /// Encode to a datagram. The extension block is padded to a whole
    /// number of 32-bit words.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut header = self.header.clone();
        header.extension = self.extension.is_some();
        header.padding = false;
        header.csrc_count = 0;

        let mut buf = BytesMut::with_capacity(
            RtpHeader::SIZE
                + self.extension.as_ref().map_or(0, |e| 4 + e.data.len() + 3)
                + self.payload.len(),
        );
        buf.extend_from_slice(&header.encode());

        if let Some(ext) = &self.extension {
            let words = ext.data.len().div_ceil(4);
            buf.extend_from_slice(&ext.profile.to_be_bytes());
            #[allow(clippy::cast_possible_truncation)]
            buf.extend_from_slice(&(words as u16).to_be_bytes());
            buf.extend_from_slice(&ext.data);
            buf.extend_from_slice(&vec![0u8; words * 4 - ext.data.len()]);
        }

        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }
}
