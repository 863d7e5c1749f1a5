use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::control::robot::RobotControlSender;
use crate::protocol::datagram::{HeadPose, RobotControl, MSG_HEAD_POSE, MSG_ROBOT_CONTROL, PACKET_LEN};
use crate::timing::SyncedClock;
use crate::types::geometry::{self, Quaternion};

struct Receiver {
    socket: UdpSocket,
}

impl Receiver {
    async fn bind() -> Self {
        Self {
            socket: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
        }
    }

    fn addr(&self) -> std::net::SocketAddr {
        self.socket.local_addr().unwrap()
    }

    async fn recv(&self) -> Vec<u8> {
        let mut buf = [0u8; 256];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), self.socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for datagram")
            .unwrap();
        buf[..len].to_vec()
    }

    async fn is_silent(&self, window: Duration) -> bool {
        let mut buf = [0u8; 256];
        tokio::time::timeout(window, self.socket.recv_from(&mut buf))
            .await
            .is_err()
    }
}

#[tokio::test]
async fn test_head_pose_datagram_on_the_wire() {
    let receiver = Receiver::bind().await;
    let clock = Arc::new(SyncedClock::new());
    let sender = RobotControlSender::new(receiver.addr(), clock.clone(), true)
        .await
        .unwrap();

    let pose = Quaternion::new(0.0, 0.3, 0.0, 0.95);
    let before = clock.now_corrected_us();
    sender.send_head_pose(pose, 0.25);

    let wire = receiver.recv().await;
    assert_eq!(wire.len(), PACKET_LEN);
    assert_eq!(wire[0], MSG_HEAD_POSE);

    let decoded = HeadPose::decode(&wire).unwrap();
    let expected = geometry::gimbal_safe_azimuth_elevation(pose);
    assert!((f64::from(decoded.azimuth) - expected.azimuth).abs() < 1e-6);
    assert!((f64::from(decoded.elevation) - expected.elevation).abs() < 1e-6);
    assert!((decoded.speed - 0.25).abs() < f32::EPSILON);
    assert!(decoded.timestamp_us >= before);

    sender.shutdown().await;
}

#[tokio::test]
async fn test_robot_control_datagram_on_the_wire() {
    let receiver = Receiver::bind().await;
    let sender = RobotControlSender::new(receiver.addr(), Arc::new(SyncedClock::new()), true)
        .await
        .unwrap();

    sender.send_robot_control(0.5, -0.1, 1.2);

    let wire = receiver.recv().await;
    assert_eq!(wire.len(), PACKET_LEN);
    assert_eq!(wire[0], MSG_ROBOT_CONTROL);

    let decoded = RobotControl::decode(&wire).unwrap();
    assert!((decoded.linear_x - 0.5).abs() < f32::EPSILON);
    assert!((decoded.linear_y + 0.1).abs() < f32::EPSILON);
    assert!((decoded.angular - 1.2).abs() < f32::EPSILON);

    sender.shutdown().await;
}

#[tokio::test]
async fn test_master_gate_suppresses_sends() {
    let receiver = Receiver::bind().await;
    let sender = RobotControlSender::new(receiver.addr(), Arc::new(SyncedClock::new()), false)
        .await
        .unwrap();

    assert!(!sender.is_enabled());
    sender.send_head_pose(Quaternion::IDENTITY, 1.0);
    sender.send_robot_control(1.0, 1.0, 1.0);

    assert!(receiver.is_silent(Duration::from_millis(300)).await);
    sender.shutdown().await;
}

#[tokio::test]
async fn test_pool_handles_bursts() {
    let receiver = Receiver::bind().await;
    let sender = RobotControlSender::new(receiver.addr(), Arc::new(SyncedClock::new()), true)
        .await
        .unwrap();

    for i in 0..20 {
        #[allow(clippy::cast_precision_loss)]
        sender.send_robot_control(i as f32, 0.0, 0.0);
    }
    for _ in 0..20 {
        let wire = receiver.recv().await;
        assert_eq!(wire.len(), PACKET_LEN);
    }

    sender.shutdown().await;
}
