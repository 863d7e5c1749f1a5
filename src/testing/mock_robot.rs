//! Mock robot-side control peer.
//!
//! Plays the robot's role against a [`ControlLink`]: sends a poll
//! datagram (optionally with a teleoperation-state JSON body) and
//! records the single reply.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

/// UDP peer that polls the control link and collects replies.
pub struct MockRobotPeer {
    socket: UdpSocket,
}

impl MockRobotPeer {
    /// Bind on an ephemeral loopback port.
    pub async fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("mock peer bind failed");
        Self { socket }
    }

    /// The peer's own address.
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr().expect("mock peer has no address")
    }

    /// Send one poll with the given body and wait for the single reply.
    pub async fn poll(&self, link: SocketAddr, body: &[u8]) -> Vec<u8> {
        self.poll_no_wait(link, body).await;
        self.recv_reply().await
    }

    /// Send one poll without waiting for the reply.
    pub async fn poll_no_wait(&self, link: SocketAddr, body: &[u8]) {
        self.socket
            .send_to(body, link)
            .await
            .expect("mock peer send failed");
    }

    /// Wait for one reply without sending anything.
    pub async fn recv_reply(&self) -> Vec<u8> {
        let mut buf = [0u8; 2048];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), self.socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for control reply")
            .expect("mock peer recv failed");
        buf[..len].to_vec()
    }

    /// True if no reply arrives within `window`.
    pub async fn assert_silent(&self, window: Duration) -> bool {
        let mut buf = [0u8; 2048];
        tokio::time::timeout(window, self.socket.recv_from(&mut buf))
            .await
            .is_err()
    }
}
