use bytes::Bytes;

use crate::protocol::rtp::extension::*;
use crate::protocol::rtp::packet::{RtpExtension, RtpHeader, RtpPacket};

fn entry(id: u8, value: u64) -> Vec<u8> {
    let mut buf = vec![id, 8];
    buf.extend_from_slice(&value.to_le_bytes());
    buf
}

fn packet_with_extension(ext: Option<RtpExtension>) -> RtpPacket {
    RtpPacket {
        header: RtpHeader::new_video(26, 1, 0, 42),
        extension: ext,
        payload: Bytes::new(),
    }
}

#[test]
fn test_profile_detection() {
    assert!(is_two_byte_profile(0x1000));
    assert!(is_two_byte_profile(0x1001));
    assert!(is_two_byte_profile(0x100F));
    assert!(!is_two_byte_profile(0xBEDE)); // one-byte form
    assert!(!is_two_byte_profile(0x2001));
    assert_eq!(two_byte_profile(APP_BITS), 0x1001);
}

#[test]
fn test_parse_all_five_entries() {
    let mut data = Vec::new();
    data.extend(entry(ID_FRAME_ID, 42));
    data.extend(entry(ID_VID_CONV, 3000));
    data.extend(entry(ID_ENC, 8000));
    data.extend(entry(ID_RTP_PAY, 1000));
    data.extend(entry(ID_RTP_PAY_WALL, 1_000_000_000));

    let meta = LatencyExtension::from_entries(&data);
    assert_eq!(meta.frame_id, Some(42));
    assert_eq!(meta.vid_conv_us, Some(3000));
    assert_eq!(meta.enc_us, Some(8000));
    assert_eq!(meta.rtp_pay_us, Some(1000));
    assert_eq!(meta.rtp_pay_wall_us, Some(1_000_000_000));
}

#[test]
fn test_parse_partial_entries() {
    let mut data = Vec::new();
    data.extend(entry(ID_FRAME_ID, 7));
    data.extend(entry(ID_RTP_PAY_WALL, 555));

    let meta = LatencyExtension::from_entries(&data);
    assert_eq!(meta.frame_id, Some(7));
    assert_eq!(meta.rtp_pay_wall_us, Some(555));
    assert_eq!(meta.vid_conv_us, None);
    assert_eq!(meta.enc_us, None);
}

#[test]
fn test_parse_skips_unknown_ids_and_wrong_lengths() {
    let mut data = Vec::new();
    data.extend_from_slice(&[9, 2, 0xAA, 0xBB]); // unknown id
    data.extend_from_slice(&[ID_ENC, 4, 1, 2, 3, 4]); // wrong length
    data.extend(entry(ID_FRAME_ID, 3));

    let meta = LatencyExtension::from_entries(&data);
    assert_eq!(meta.frame_id, Some(3));
    assert_eq!(meta.enc_us, None);
}

#[test]
fn test_parse_stops_at_zero_padding() {
    let mut data = entry(ID_FRAME_ID, 1);
    data.extend_from_slice(&[0, 0, 0, 0]);
    // Entries after padding are unreachable by construction.
    data.extend(entry(ID_ENC, 9));

    let meta = LatencyExtension::from_entries(&data);
    assert_eq!(meta.frame_id, Some(1));
    assert_eq!(meta.enc_us, None);
}

#[test]
fn test_from_packet_requires_two_byte_profile() {
    let one_byte = packet_with_extension(Some(RtpExtension {
        profile: 0xBEDE,
        data: Bytes::copy_from_slice(&entry(ID_FRAME_ID, 5)),
    }));
    assert!(LatencyExtension::from_packet(&one_byte).is_none());

    let none = packet_with_extension(None);
    assert!(LatencyExtension::from_packet(&none).is_none());
}

#[test]
fn test_extension_round_trip_through_packet() {
    let meta = LatencyExtension {
        frame_id: Some(42),
        vid_conv_us: Some(3000),
        enc_us: Some(8000),
        rtp_pay_us: Some(1000),
        rtp_pay_wall_us: Some(1_000_000_000),
    };

    let packet = packet_with_extension(Some(meta.to_extension()));
    let wire = packet.encode();
    let decoded = RtpPacket::decode(wire).unwrap();

    let parsed = LatencyExtension::from_packet(&decoded).unwrap();
    assert_eq!(parsed, meta);
}

#[test]
fn test_empty_metadata() {
    assert!(LatencyExtension::default().is_empty());
    let meta = LatencyExtension { frame_id: Some(0), ..Default::default() };
    assert!(!meta.is_empty());
}
