use std::str::FromStr;

use crate::types::config::*;

#[test]
fn test_resolution_label_lookup() {
    let fhd = CameraResolution::from_label("FHD").unwrap();
    assert_eq!(fhd.width, 1920);
    assert_eq!(fhd.height, 1080);
    assert_eq!(fhd.frame_bytes(), 1920 * 1080 * 3);
    assert_eq!(fhd.x_dimensions(), "1920,1080");
}

#[test]
fn test_resolution_unknown_label() {
    let err = CameraResolution::from_label("8K").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownResolution(_)));
}

#[test]
fn test_resolution_index_round_trip() {
    for (i, res) in RESOLUTIONS.iter().enumerate() {
        assert_eq!(res.index(), i);
        assert_eq!(CameraResolution::from_index(i).unwrap(), *res);
    }
    assert!(CameraResolution::from_index(RESOLUTIONS.len()).is_err());
}

#[test]
fn test_ip_octets_parse_and_display() {
    let ip = IpOctets::from_str("192.168.1.105").unwrap();
    assert_eq!(ip, IpOctets([192, 168, 1, 105]));
    assert_eq!(ip.to_string(), "192.168.1.105");
}

#[test]
fn test_ip_octets_rejects_garbage() {
    assert!(IpOctets::from_str("192.168.1").is_err());
    assert!(IpOctets::from_str("192.168.1.105.6").is_err());
    assert!(IpOctets::from_str("192.168.1.300").is_err());
    assert!(IpOctets::from_str("robot.local").is_err());
}

#[test]
fn test_local_ipv4_discovery() {
    // Environments without a default route legitimately return None;
    // a discovered address must at least be a real one.
    if let Some(ip) = local_ipv4() {
        assert_ne!(ip, IpOctets([0, 0, 0, 0]));
    }
}

#[test]
fn test_codec_rtp_parameters() {
    assert_eq!(Codec::Jpeg.payload_type(), 26);
    assert_eq!(Codec::H264.payload_type(), 96);
    assert_eq!(Codec::H265.payload_type(), 96);
    assert_eq!(Codec::Jpeg.encoding_name(), "JPEG");
    assert_eq!(Codec::H265.encoding_name(), "H265");
}

#[test]
fn test_builder_defaults() {
    let config = StreamingConfig::builder().build().unwrap();
    assert_eq!(config.port_left, DEFAULT_PORT_LEFT);
    assert_eq!(config.port_right, DEFAULT_PORT_RIGHT);
    assert_eq!(config.resolution.label, "FHD");
    assert_eq!(config.codec, Codec::Jpeg);
    assert!(!config.robot_control_enabled);
}

#[test]
fn test_builder_resolution_label_validated() {
    let err = StreamingConfig::builder()
        .resolution_label("definitely-not-a-resolution")
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownResolution(_)));
}

#[test]
fn test_builder_rejects_inverted_range() {
    let range = MovementRange {
        azimuth_min: 100,
        azimuth_max: -100,
        ..MovementRange::default()
    };
    let err = StreamingConfig::builder()
        .movement_range(range)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidRange("azimuth")));
}

#[test]
fn test_speed_multiplier_lands_in_range() {
    let config = StreamingConfig::builder()
        .head_movement_speed_multiplier(0.5)
        .build()
        .unwrap();
    assert!((config.movement_range.speed_multiplier - 0.5).abs() < f32::EPSILON);
}
