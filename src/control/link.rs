//! Request/response control link.
//!
//! A UDP socket bound on a well-known local port. The robot polls; every
//! poll triggers exactly one reply, drained from the priority queue or
//! the single-byte empty frame when nothing is pending. Poll payloads
//! carry teleoperation-state JSON for the HUD.
//!
//! Replies go to the most recent poll's source address. The link follows
//! a peer address change silently apart from a log line; there is no
//! peer authentication.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::hud::{HudState, TeleoperationUpdate};
use super::pose::PoseMapper;
use super::queue::{Priority, TaskQueue};
use crate::protocol::servo::{self, LatencyReport};
use crate::stats::FrameStatsSnapshot;
use crate::timing::SyncedClock;
use crate::types::config::MovementRange;
use crate::types::geometry::Quaternion;

enum ControlTask {
    FrameLatency(FrameStatsSnapshot),
    SetMode,
    ResetErrors,
    EnableServos(bool),
    PoseAndSpeed {
        pose: Quaternion,
        speed: u32,
        range: MovementRange,
        axes_swapped: bool,
    },
}

impl ControlTask {
    fn priority(&self) -> Priority {
        match self {
            Self::FrameLatency(_) => Priority::FrameLatency,
            Self::SetMode => Priority::SetMode,
            Self::ResetErrors => Priority::ResetErrors,
            Self::EnableServos(_) => Priority::EnableServos,
            Self::PoseAndSpeed { .. } => Priority::SetPoseAndSpeed,
        }
    }
}

struct LinkShared {
    socket: Arc<UdpSocket>,
    peer: Mutex<Option<SocketAddr>>,
    queue: Mutex<TaskQueue<ControlTask>>,
    mapper: Mutex<PoseMapper>,
    hud: Arc<HudState>,
    clock: Arc<SyncedClock>,
}

/// The request/response control channel to the robot.
pub struct ControlLink {
    shared: Arc<LinkShared>,
    listener_shutdown_tx: mpsc::Sender<()>,
    worker_shutdown_tx: mpsc::Sender<()>,
    listener: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ControlLink {
    /// Bind the link socket and start the listener and worker tasks.
    ///
    /// # Errors
    /// Returns the socket error when the port cannot be bound.
    pub async fn bind(
        port: u16,
        clock: Arc<SyncedClock>,
        hud: Arc<HudState>,
        elevation_trim: f64,
    ) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(("0.0.0.0", port)).await?);
        tracing::info!(port = socket.local_addr()?.port(), "control link listening");

        let shared = Arc::new(LinkShared {
            socket,
            peer: Mutex::new(None),
            queue: Mutex::new(TaskQueue::new()),
            mapper: Mutex::new(PoseMapper::with_elevation_trim(elevation_trim)),
            hud,
            clock,
        });

        // One trigger per poll; an unbounded channel keeps the
        // one-poll-one-reply pairing exact even under poll bursts.
        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        let (listener_shutdown_tx, listener_shutdown_rx) = mpsc::channel(1);
        let (worker_shutdown_tx, worker_shutdown_rx) = mpsc::channel(1);

        let listener = tokio::spawn(run_listener(
            shared.clone(),
            poll_tx,
            listener_shutdown_rx,
        ));
        let worker = tokio::spawn(run_worker(shared.clone(), poll_rx, worker_shutdown_rx));

        Ok(Self {
            shared,
            listener_shutdown_tx,
            worker_shutdown_tx,
            listener: Some(listener),
            worker: Some(worker),
        })
    }

    /// Address the link is bound on.
    ///
    /// # Errors
    /// Returns the socket error if the address is unavailable.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.shared.socket.local_addr()
    }

    /// Number of tasks pending in the queue.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.shared.queue.lock().expect("task queue mutex poisoned").len()
    }

    /// Whether a task is pending at the given priority.
    #[must_use]
    pub fn has_pending(&self, priority: Priority) -> bool {
        self.shared
            .queue
            .lock()
            .expect("task queue mutex poisoned")
            .contains(priority)
    }

    fn enqueue(&self, task: ControlTask) {
        let priority = task.priority();
        let replaced = self
            .shared
            .queue
            .lock()
            .expect("task queue mutex poisoned")
            .insert(priority, task);
        if replaced {
            tracing::trace!(?priority, "replaced pending control task");
        }
    }

    /// Queue a latched-error reset for both drives.
    pub fn reset_errors(&self) {
        self.enqueue(ControlTask::ResetErrors);
    }

    /// Queue a drive enable or disable.
    pub fn enable_servos(&self, enable: bool) {
        self.enqueue(ControlTask::EnableServos(enable));
    }

    /// Queue a switch of both drives into position mode.
    pub fn set_mode(&self) {
        self.enqueue(ControlTask::SetMode);
    }

    /// Queue the current head pose and speed. Bursts between two polls
    /// collapse to the newest pose.
    pub fn set_pose_and_speed(
        &self,
        pose: Quaternion,
        speed: u32,
        range: MovementRange,
        axes_swapped: bool,
    ) {
        self.enqueue(ControlTask::PoseAndSpeed { pose, speed, range, axes_swapped });
    }

    /// Queue a latency report for the robot-side log. Lowest priority,
    /// yields to any control action.
    pub fn set_frame_latency(&self, snapshot: FrameStatsSnapshot) {
        self.enqueue(ControlTask::FrameLatency(snapshot));
    }

    /// Stop the worker, then the listener, and join both.
    pub async fn shutdown(mut self) {
        let _ = self.worker_shutdown_tx.send(()).await;
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
        let _ = self.listener_shutdown_tx.send(()).await;
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
    }
}

async fn run_listener(
    shared: Arc<LinkShared>,
    poll_tx: mpsc::UnboundedSender<()>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut buf = vec![0u8; 2048];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            result = shared.socket.recv_from(&mut buf) => {
                let (len, src) = match result {
                    Ok(received) => received,
                    Err(e) => {
                        tracing::warn!("control link recv failed: {e}");
                        continue;
                    }
                };

                {
                    let mut peer = shared.peer.lock().expect("peer mutex poisoned");
                    if *peer != Some(src) {
                        // Weak authentication by design: replies follow
                        // whoever polled last.
                        tracing::info!(peer = %src, "control peer address changed");
                        *peer = Some(src);
                    }
                }

                if len > 0 {
                    match serde_json::from_slice::<TeleoperationUpdate>(&buf[..len]) {
                        Ok(update) => shared.hud.apply(&update),
                        Err(e) => {
                            tracing::warn!("discarding malformed teleoperation state: {e}");
                        }
                    }
                }

                tracing::debug!(peer = %src, "poll received");
                if poll_tx.send(()).is_err() {
                    break;
                }
            }
        }
    }
}

async fn run_worker(
    shared: Arc<LinkShared>,
    mut poll_rx: mpsc::UnboundedReceiver<()>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut prev_reply_end_us: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            trigger = poll_rx.recv() => {
                if trigger.is_none() {
                    break;
                }

                let poll_start_us = shared.clock.now_corrected_us();
                let task = shared
                    .queue
                    .lock()
                    .expect("task queue mutex poisoned")
                    .pop();

                let reply = match task {
                    Some((priority, task)) => {
                        tracing::debug!(?priority, "draining control task");
                        encode_task(&shared, task)
                    }
                    None => servo::empty_message(),
                };

                let peer = *shared.peer.lock().expect("peer mutex poisoned");
                let Some(peer) = peer else { continue };
                if let Err(e) = shared.socket.send_to(&reply, peer).await {
                    // Transient send failures drop this reply; the next
                    // poll retries whatever is queued.
                    tracing::warn!(peer = %peer, "control reply send failed: {e}");
                    continue;
                }

                let reply_end_us = shared.clock.now_corrected_us();
                if prev_reply_end_us > 0 {
                    // Corrected time can step backwards when the NTP
                    // offset moves mid-reply.
                    #[allow(clippy::cast_precision_loss)]
                    let reply_fps =
                        1e6 / reply_end_us.saturating_sub(prev_reply_end_us).max(1) as f64;
                    tracing::debug!(
                        took_us = reply_end_us.saturating_sub(poll_start_us),
                        reply_fps,
                        "control reply sent"
                    );
                }
                prev_reply_end_us = reply_end_us;
            }
        }
    }
}

fn encode_task(shared: &LinkShared, task: ControlTask) -> Vec<u8> {
    match task {
        ControlTask::FrameLatency(snapshot) => {
            servo::latency_message(&LatencyReport::from(&snapshot))
        }
        ControlTask::SetMode => servo::set_mode_message(),
        ControlTask::ResetErrors => servo::reset_errors_message(),
        ControlTask::EnableServos(enable) => servo::enable_servos_message(enable),
        ControlTask::PoseAndSpeed { pose, speed, range, axes_swapped } => {
            let target = shared
                .mapper
                .lock()
                .expect("pose mapper mutex poisoned")
                .target(pose, &range);
            #[allow(clippy::cast_possible_wrap)]
            let speed = speed as i32;
            servo::pose_and_speed_message(&target, speed, axes_swapped)
        }
    }
}
