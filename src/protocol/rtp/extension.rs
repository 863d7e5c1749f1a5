//! RFC 8285 two-byte header extensions carrying latency metadata.
//!
//! The sender tags every packet with up to five 8-byte entries: the
//! frame id and the sender-side stage durations, plus the wall-clock
//! time of RTP payloading on the shared corrected timeline. Ids start
//! at 0, matching the peer's numbering.

use byteorder::{ByteOrder, LittleEndian};
use bytes::BytesMut;

use super::packet::{RtpExtension, RtpPacket};

/// App bits the sender sets in the "defined by profile" word.
pub const APP_BITS: u8 = 1;

/// Extension entry id carrying the frame id.
pub const ID_FRAME_ID: u8 = 0;
/// Entry id for the video-conversion duration, µs.
pub const ID_VID_CONV: u8 = 1;
/// Entry id for the encode duration, µs.
pub const ID_ENC: u8 = 2;
/// Entry id for the RTP payloading duration, µs.
pub const ID_RTP_PAY: u8 = 3;
/// Entry id for the payloading wall-clock timestamp, µs.
pub const ID_RTP_PAY_WALL: u8 = 4;

/// Whether a profile word announces the two-byte extension form.
#[must_use]
pub fn is_two_byte_profile(profile: u16) -> bool {
    profile >> 4 == 0x100
}

/// Profile word for outbound two-byte extensions.
#[must_use]
pub fn two_byte_profile(app_bits: u8) -> u16 {
    0x1000 | u16::from(app_bits & 0x0F)
}

/// Iterate `(id, data)` entries of a two-byte extension block.
///
/// The peer numbers entries from 0, so a `0x00,0x00` pair (not a lone
/// zero byte) terminates as padding.
pub fn entries(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut offset = 0;
    std::iter::from_fn(move || {
        if offset + 2 > data.len() {
            return None;
        }
        let id = data[offset];
        let len = usize::from(data[offset + 1]);
        if id == 0 && len == 0 {
            return None;
        }
        offset += 2;
        if offset + len > data.len() {
            return None;
        }
        let entry = &data[offset..offset + len];
        offset += len;
        Some((id, entry))
    })
}

/// Per-frame latency metadata recovered from a packet.
///
/// Each field is independently optional; entries the sender omitted
/// leave the previous frame's value in force downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyExtension {
    /// Producer-assigned frame id.
    pub frame_id: Option<u64>,
    /// Sender video-conversion duration, µs.
    pub vid_conv_us: Option<u64>,
    /// Sender encode duration, µs.
    pub enc_us: Option<u64>,
    /// Sender RTP payloading duration, µs.
    pub rtp_pay_us: Option<u64>,
    /// Wall-clock payloading timestamp on the corrected timeline, µs.
    pub rtp_pay_wall_us: Option<u64>,
}

impl LatencyExtension {
    /// Extract the metadata from a decoded packet.
    ///
    /// Returns `None` when the packet carries no two-byte extension
    /// block; an extension without recognized entries yields the empty
    /// (all-`None`) metadata.
    #[must_use]
    pub fn from_packet(packet: &RtpPacket) -> Option<Self> {
        let ext = packet.extension.as_ref()?;
        if !is_two_byte_profile(ext.profile) {
            return None;
        }
        Some(Self::from_entries(&ext.data))
    }

    /// Parse from a raw two-byte extension payload.
    #[must_use]
    pub fn from_entries(data: &[u8]) -> Self {
        let mut meta = Self::default();
        for (id, entry) in entries(data) {
            if entry.len() != 8 {
                continue;
            }
            let value = LittleEndian::read_u64(entry);
            match id {
                ID_FRAME_ID => meta.frame_id = Some(value),
                ID_VID_CONV => meta.vid_conv_us = Some(value),
                ID_ENC => meta.enc_us = Some(value),
                ID_RTP_PAY => meta.rtp_pay_us = Some(value),
                ID_RTP_PAY_WALL => meta.rtp_pay_wall_us = Some(value),
                _ => {}
            }
        }
        meta
    }

    /// Whether any entry is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame_id.is_none()
            && self.vid_conv_us.is_none()
            && self.enc_us.is_none()
            && self.rtp_pay_us.is_none()
            && self.rtp_pay_wall_us.is_none()
    }

    /// Encode as an RTP extension block, the sender's counterpart of
    /// [`LatencyExtension::from_packet`].
    #[must_use]
    pub fn to_extension(&self) -> RtpExtension {
        let mut data = BytesMut::new();
        let mut push = |id: u8, value: Option<u64>| {
            if let Some(value) = value {
                data.extend_from_slice(&[id, 8]);
                let mut word = [0u8; 8];
                LittleEndian::write_u64(&mut word, value);
                data.extend_from_slice(&word);
            }
        };
        push(ID_FRAME_ID, self.frame_id);
        push(ID_VID_CONV, self.vid_conv_us);
        push(ID_ENC, self.enc_us);
        push(ID_RTP_PAY, self.rtp_pay_us);
        push(ID_RTP_PAY_WALL, self.rtp_pay_wall_us);

        RtpExtension {
            profile: two_byte_profile(APP_BITS),
            data: data.freeze(),
        }
    }
}
