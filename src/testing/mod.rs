//! In-crate test support: crafted RTP frames and a mock robot peer.

pub mod mock_robot;

use bytes::Bytes;

use crate::protocol::rtp::{LatencyExtension, RtpHeader, RtpPacket};

/// Build the wire bytes of one RTP video packet, optionally carrying
/// latency metadata in a two-byte header extension.
pub fn rtp_datagram(
    payload_type: u8,
    sequence: u16,
    timestamp: u32,
    marker: bool,
    payload: &[u8],
    meta: Option<&LatencyExtension>,
) -> Vec<u8> {
    let mut header = RtpHeader::new_video(payload_type, sequence, timestamp, 0x0005_1EED);
    header.marker = marker;
    let packet = RtpPacket {
        header,
        extension: meta.map(LatencyExtension::to_extension),
        payload: Bytes::copy_from_slice(payload),
    };
    packet.encode().to_vec()
}

/// A single-packet frame tagged with sender metadata.
pub fn single_packet_frame(
    payload_type: u8,
    sequence: u16,
    frame_id: u64,
    payload: &[u8],
    pay_wall_us: u64,
) -> Vec<u8> {
    let meta = LatencyExtension {
        frame_id: Some(frame_id),
        vid_conv_us: Some(3000),
        enc_us: Some(8000),
        rtp_pay_us: Some(1000),
        rtp_pay_wall_us: Some(pay_wall_us),
    };
    rtp_datagram(payload_type, sequence, u32::from(sequence) * 3000, true, payload, Some(&meta))
}
