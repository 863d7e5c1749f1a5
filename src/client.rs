//! Session owner.
//!
//! Builds the clock, the two ingest pipelines, the control link and the
//! datagram sender from one configuration, and tears them down in the
//! reverse dependency order: datagram pool, control worker and listener,
//! pipelines and their event loop, NTP sync.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::control::hud::{HudSnapshot, HudState};
use crate::control::link::ControlLink;
use crate::control::robot::RobotControlSender;
use crate::error::TelepresenceError;
use crate::ingest::supervisor::PipelineSupervisor;
use crate::stats::FrameStatsSnapshot;
use crate::timing::clock::SyncedClock;
use crate::timing::sync::NtpTimer;
use crate::types::config::{StreamingConfig, SERVO_DATAGRAM_PORT};
use crate::types::geometry::{Quaternion, ELEVATION_TRIM_RAD};
use crate::video::decoder::DecoderFactory;
use crate::video::frame::{Eye, FramePair};

/// The assembled telepresence client core.
///
/// The render loop reads [`TelepresenceClient::frame_pair`] and
/// [`TelepresenceClient::hud`] each frame and feeds poses back through
/// [`TelepresenceClient::submit_pose`].
pub struct TelepresenceClient {
    config: StreamingConfig,
    clock: Arc<SyncedClock>,
    hud: Arc<HudState>,
    ntp: Option<NtpTimer>,
    supervisor: PipelineSupervisor,
    link: Option<ControlLink>,
    robot: Option<RobotControlSender>,
}

impl TelepresenceClient {
    /// Start a session with the default decoder factory.
    ///
    /// # Errors
    /// Returns `TelepresenceError` when a socket cannot be bound; no
    /// tasks are leaked on failure.
    pub async fn start(config: StreamingConfig) -> Result<Self, TelepresenceError> {
        Self::start_with_decoder_factory(config, None).await
    }

    /// Start a session, optionally with a codec-backed decoder factory.
    ///
    /// # Errors
    /// Returns `TelepresenceError` when a socket cannot be bound.
    pub async fn start_with_decoder_factory(
        config: StreamingConfig,
        decoder_factory: Option<DecoderFactory>,
    ) -> Result<Self, TelepresenceError> {
        let clock = Arc::new(SyncedClock::new());
        let hud = Arc::new(HudState::new());

        let ntp = NtpTimer::start(config.ntp_server.clone(), clock.clone());

        let mut supervisor = match decoder_factory {
            Some(factory) => PipelineSupervisor::with_decoder_factory(clock.clone(), factory),
            None => PipelineSupervisor::new(clock.clone()),
        };
        if let Err(e) = supervisor.configure(&config).await {
            supervisor.shutdown().await;
            ntp.shutdown().await;
            return Err(e.into());
        }

        let link = match ControlLink::bind(
            config.control_port,
            clock.clone(),
            hud.clone(),
            ELEVATION_TRIM_RAD,
        )
        .await
        {
            Ok(link) => link,
            Err(e) => {
                supervisor.shutdown().await;
                ntp.shutdown().await;
                return Err(e.into());
            }
        };

        // Distinct socket from the link: the link's port is bound for
        // inbound polls.
        let dest = SocketAddr::from((config.peer_ip.to_ipv4(), SERVO_DATAGRAM_PORT));
        let robot = match RobotControlSender::new(
            dest,
            clock.clone(),
            config.robot_control_enabled,
        )
        .await
        {
            Ok(robot) => robot,
            Err(e) => {
                link.shutdown().await;
                supervisor.shutdown().await;
                ntp.shutdown().await;
                return Err(e.into());
            }
        };

        Ok(Self {
            config,
            clock,
            hud,
            ntp: Some(ntp),
            supervisor,
            link: Some(link),
            robot: Some(robot),
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// The shared corrected clock.
    #[must_use]
    pub fn clock(&self) -> Arc<SyncedClock> {
        self.clock.clone()
    }

    /// The frame pair the renderer samples. Stable across reconfigures.
    #[must_use]
    pub fn frame_pair(&self) -> Arc<FramePair> {
        self.supervisor.frame_pair()
    }

    /// The HUD state the renderer draws.
    #[must_use]
    pub fn hud(&self) -> HudSnapshot {
        self.hud.snapshot()
    }

    /// The request/response control link.
    ///
    /// # Panics
    /// Panics after `shutdown`; the client is consumed then.
    #[must_use]
    pub fn link(&self) -> &ControlLink {
        self.link.as_ref().expect("control link gone before shutdown")
    }

    /// Ring-averaged statistics for one eye.
    #[must_use]
    pub fn averaged_stats(&self, eye: Eye) -> FrameStatsSnapshot {
        self.supervisor.stats(eye).averaged_snapshot()
    }

    /// Ports the ingest pipelines bound, left first. Resolves port 0
    /// requests to the actual ephemeral ports.
    #[must_use]
    pub fn ingest_ports(&self) -> Vec<u16> {
        self.supervisor.bound_ports()
    }

    /// Feed the operator's head pose into both egress paths: the
    /// pose-and-speed task on the control link (collapsing bursts) and
    /// the fire-and-forget head-pose datagram.
    ///
    /// `speed` is normalized to `[0, 1]` and scaled onto the configured
    /// maximum for the servo path.
    pub fn submit_pose(&self, pose: Quaternion, speed: f32, axes_swapped: bool) {
        let speed = speed.clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let servo_speed = (f64::from(speed) * f64::from(self.config.head_movement_max_speed))
            .round() as u32;

        if let Some(link) = &self.link {
            link.set_pose_and_speed(
                pose,
                servo_speed,
                self.config.movement_range,
                axes_swapped,
            );
        }
        if let Some(robot) = &self.robot {
            robot.send_head_pose(pose, speed);
        }
    }

    /// Send a mobile-base velocity command.
    pub fn submit_base_velocity(&self, linear_x: f32, linear_y: f32, angular: f32) {
        if let Some(robot) = &self.robot {
            robot.send_robot_control(linear_x, linear_y, angular);
        }
    }

    /// Queue the current averaged latency telemetry for the robot log.
    pub fn report_frame_latency(&self, eye: Eye) {
        if let Some(link) = &self.link {
            link.set_frame_latency(self.averaged_stats(eye));
        }
    }

    /// Record that the renderer presented the current frames.
    pub fn mark_presented(&self) {
        let now_us = self.clock.now_corrected_us();
        self.supervisor.stats(Eye::Left).mark_presented(now_us);
        self.supervisor.stats(Eye::Right).mark_presented(now_us);
    }

    /// Switch to a new stream configuration. Control sockets stay up;
    /// only the ingest side is rebuilt.
    ///
    /// # Errors
    /// Returns `TelepresenceError` when the new pipelines cannot be
    /// built; the ingest side is left torn down in that case.
    pub async fn reconfigure(&mut self, config: StreamingConfig) -> Result<(), TelepresenceError> {
        self.supervisor.configure(&config).await?;
        self.config = config;
        Ok(())
    }

    /// Tear everything down in declaration order: datagram pool, then
    /// control worker and listener, then the pipelines and their event
    /// loop, then the NTP sync task.
    pub async fn shutdown(&mut self) {
        if let Some(robot) = self.robot.take() {
            robot.shutdown().await;
        }
        if let Some(link) = self.link.take() {
            link.shutdown().await;
        }
        self.supervisor.shutdown().await;
        if let Some(ntp) = self.ntp.take() {
            ntp.shutdown().await;
        }
        tracing::info!("telepresence client shut down");
    }
}
