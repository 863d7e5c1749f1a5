//! Fire-and-forget robot-control datagram sender.
//!
//! Head poses and base velocities go out as fixed 21-byte packets, no
//! response expected. Sends are dispatched to a small worker pool so the
//! render thread never blocks on the socket.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::protocol::datagram::{HeadPose, RobotControl};
use crate::timing::SyncedClock;
use crate::types::geometry::{self, Quaternion};

/// Workers serving the send queue.
pub const POOL_SIZE: usize = 3;

/// Depth of the send queue; bursts beyond it are dropped.
const QUEUE_DEPTH: usize = 64;

enum SendJob {
    HeadPose {
        pose: Quaternion,
        speed: f32,
    },
    RobotControl {
        linear_x: f32,
        linear_y: f32,
        angular: f32,
    },
}

/// Sender for the fire-and-forget control datagrams.
pub struct RobotControlSender {
    job_tx: mpsc::Sender<SendJob>,
    workers: Vec<JoinHandle<()>>,
    enabled: bool,
}

impl RobotControlSender {
    /// Bind a sender socket and start the worker pool.
    ///
    /// `enabled` is the master gate: when false, every send is a no-op.
    ///
    /// # Errors
    /// Returns the socket error when binding fails.
    pub async fn new(
        dest: SocketAddr,
        clock: Arc<SyncedClock>,
        enabled: bool,
    ) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        let (job_tx, job_rx) = mpsc::channel(QUEUE_DEPTH);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = (0..POOL_SIZE)
            .map(|_| {
                tokio::spawn(run_worker(
                    socket.clone(),
                    dest,
                    clock.clone(),
                    job_rx.clone(),
                ))
            })
            .collect();

        tracing::info!(dest = %dest, enabled, "robot control sender ready");
        Ok(Self { job_tx, workers, enabled })
    }

    /// Whether the master gate allows sends.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Send the operator's head orientation. Best-effort: dropped when
    /// disabled or when the queue is full.
    pub fn send_head_pose(&self, pose: Quaternion, speed: f32) {
        if !self.enabled {
            return;
        }
        if self.job_tx.try_send(SendJob::HeadPose { pose, speed }).is_err() {
            tracing::debug!("head pose dropped, send queue full");
        }
    }

    /// Send a mobile-base velocity command. Best-effort.
    pub fn send_robot_control(&self, linear_x: f32, linear_y: f32, angular: f32) {
        if !self.enabled {
            return;
        }
        let job = SendJob::RobotControl { linear_x, linear_y, angular };
        if self.job_tx.try_send(job).is_err() {
            tracing::debug!("robot control dropped, send queue full");
        }
    }

    /// Drain the pool and join the workers.
    pub async fn shutdown(self) {
        drop(self.job_tx);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn run_worker(
    socket: Arc<UdpSocket>,
    dest: SocketAddr,
    clock: Arc<SyncedClock>,
    job_rx: Arc<Mutex<mpsc::Receiver<SendJob>>>,
) {
    loop {
        let job = job_rx.lock().await.recv().await;
        let Some(job) = job else { break };

        let timestamp_us = clock.now_corrected_us();
        let packet: [u8; crate::protocol::datagram::PACKET_LEN] = match job {
            SendJob::HeadPose { pose, speed } => {
                let angles = geometry::gimbal_safe_azimuth_elevation(pose);
                #[allow(clippy::cast_possible_truncation)]
                let pose = HeadPose {
                    azimuth: angles.azimuth as f32,
                    elevation: angles.elevation as f32,
                    speed,
                    timestamp_us,
                };
                pose.encode()
            }
            SendJob::RobotControl { linear_x, linear_y, angular } => {
                RobotControl { linear_x, linear_y, angular, timestamp_us }.encode()
            }
        };

        if let Err(e) = socket.send_to(&packet, dest).await {
            tracing::warn!(dest = %dest, "robot control send failed: {e}");
        }
    }
}
