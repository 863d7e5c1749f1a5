use proptest::prelude::*;

use crate::protocol::datagram::*;

#[test]
fn test_head_pose_wire_bytes() {
    let pose = HeadPose {
        azimuth: 1.0,
        elevation: -0.5,
        speed: 0.25,
        timestamp_us: 0x0123_4567_89AB_CDEF,
    };
    let wire = pose.encode();

    assert_eq!(wire.len(), 21);
    assert_eq!(
        wire,
        [
            0x01,
            0x00, 0x00, 0x80, 0x3F, // 1.0
            0x00, 0x00, 0x00, 0xBF, // -0.5
            0x00, 0x00, 0x80, 0x3E, // 0.25
            0xEF, 0xCD, 0xAB, 0x89, 0x67, 0x45, 0x23, 0x01,
        ]
    );
}

#[test]
fn test_head_pose_type_byte_and_length() {
    let wire = HeadPose {
        azimuth: 0.0,
        elevation: 0.0,
        speed: 0.0,
        timestamp_us: 0,
    }
    .encode();
    assert_eq!(wire.len(), PACKET_LEN);
    assert_eq!(wire[0], MSG_HEAD_POSE);
}

#[test]
fn test_robot_control_type_byte_and_length() {
    let wire = RobotControl {
        linear_x: 0.5,
        linear_y: -0.25,
        angular: 1.5,
        timestamp_us: 99,
    }
    .encode();
    assert_eq!(wire.len(), PACKET_LEN);
    assert_eq!(wire[0], MSG_ROBOT_CONTROL);
}

#[test]
fn test_decode_rejects_wrong_length() {
    assert_eq!(
        HeadPose::decode(&[0x01; 20]).unwrap_err(),
        DatagramDecodeError::BadLength(20)
    );
    assert_eq!(
        RobotControl::decode(&[0x02; 22]).unwrap_err(),
        DatagramDecodeError::BadLength(22)
    );
}

#[test]
fn test_decode_rejects_wrong_type() {
    let mut wire = HeadPose {
        azimuth: 0.0,
        elevation: 0.0,
        speed: 0.0,
        timestamp_us: 0,
    }
    .encode();
    wire[0] = MSG_ROBOT_CONTROL;
    assert_eq!(
        HeadPose::decode(&wire).unwrap_err(),
        DatagramDecodeError::UnknownType(MSG_ROBOT_CONTROL)
    );
}

proptest! {
    #[test]
    fn prop_head_pose_round_trip(
        azimuth in -4.0f32..4.0,
        elevation in -2.0f32..2.0,
        speed in 0.0f32..1.0,
        timestamp_us in any::<u64>(),
    ) {
        let pose = HeadPose { azimuth, elevation, speed, timestamp_us };
        let decoded = HeadPose::decode(&pose.encode()).unwrap();
        prop_assert_eq!(decoded, pose);
    }

    #[test]
    fn prop_robot_control_round_trip(
        linear_x in -2.0f32..2.0,
        linear_y in -2.0f32..2.0,
        angular in -4.0f32..4.0,
        timestamp_us in any::<u64>(),
    ) {
        let control = RobotControl { linear_x, linear_y, angular, timestamp_us };
        let decoded = RobotControl::decode(&control.encode()).unwrap();
        prop_assert_eq!(decoded, control);
    }
}
