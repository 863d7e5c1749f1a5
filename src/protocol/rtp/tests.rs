mod extension;

use crate::protocol::rtp::RtpCaps;
use crate::protocol::rtp::packet::RtpHeader;
use crate::types::config::{CameraResolution, Codec};

#[test]
fn test_caps_for_jpeg_stream() {
    let res = CameraResolution::from_label("HD").unwrap();
    let caps = RtpCaps::for_stream(Codec::Jpeg, &res);
    assert_eq!(caps.payload_type, 26);
    assert_eq!(caps.encoding_name, "JPEG");
    assert_eq!(caps.clock_rate, 90_000);
    assert_eq!(caps.dimensions, (1280, 720));
}

#[test]
fn test_caps_accepts_matching_payload_type() {
    let res = CameraResolution::default();
    let caps = RtpCaps::for_stream(Codec::H264, &res);

    let matching = RtpHeader::new_video(96, 0, 0, 1);
    let wrong = RtpHeader::new_video(26, 0, 0, 1);
    assert!(caps.accepts(&matching));
    assert!(!caps.accepts(&wrong));
}

#[test]
fn test_caps_display_matches_negotiated_string() {
    let res = CameraResolution::from_label("FHD").unwrap();
    let caps = RtpCaps::for_stream(Codec::H265, &res);
    assert_eq!(
        caps.to_string(),
        "application/x-rtp, media=video, encoding-name=H265, payload=96, \
         clock-rate=90000, x-dimensions=\"1920,1080\""
    );
}
