//! One eye's receive pipeline.
//!
//! State machine: `Null -- configure --> Ready -- play --> Playing`,
//! back to `Null` on teardown or a runtime fault. Configuring binds the
//! UDP source; playing spawns the receive task that drives the stage
//! graph: jitter buffer, frame reassembly, decode, delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::jitter::{JitterConfig, RtpJitterBuffer};
use super::supervisor::PipelineEvent;
use super::{IngestError, Stage, StageProbe};
use crate::protocol::rtp::{LatencyExtension, RtpCaps, RtpPacket};
use crate::stats::FrameStats;
use crate::timing::SyncedClock;
use crate::types::config::{CameraResolution, Codec};
use crate::video::decoder::VideoDecoder;
use crate::video::frame::{Eye, FrameSink};

/// Receive buffer size; comfortably above any RTP datagram.
const RECV_BUFFER_LEN: usize = 65_536;

/// Static description of one eye's stream.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Which eye this pipeline feeds.
    pub eye: Eye,
    /// Local RTP ingress port.
    pub port: u16,
    /// Stream codec.
    pub codec: Codec,
    /// Frame geometry.
    pub resolution: CameraResolution,
    /// Jitter buffer tuning.
    pub jitter: JitterConfig,
}

/// Pipeline lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IngestState {
    /// No resources held.
    Null = 0,
    /// Socket bound, not receiving.
    Ready = 1,
    /// Receive task running.
    Playing = 2,
}

/// Shared state cell so the receive task can report a fault teardown.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: IngestState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> IngestState {
        match self.0.load(Ordering::Acquire) {
            1 => IngestState::Ready,
            2 => IngestState::Playing,
            _ => IngestState::Null,
        }
    }

    fn set(&self, state: IngestState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Reassembles access units from released RTP packets.
///
/// Payloads accumulate until the marker bit closes the frame. A lost
/// packet or a timestamp change mid-frame discards the partial unit.
struct FrameAssembler {
    parts: Vec<u8>,
    current_ts: Option<u32>,
}

impl FrameAssembler {
    fn new() -> Self {
        Self { parts: Vec::new(), current_ts: None }
    }

    fn reset(&mut self) {
        self.parts.clear();
        self.current_ts = None;
    }

    fn push(&mut self, packet: &RtpPacket) -> Option<Vec<u8>> {
        if self.current_ts.is_some_and(|ts| ts != packet.header.timestamp) {
            // Mid-frame timestamp change: the tail of the previous
            // frame never arrived.
            self.reset();
        }
        self.current_ts = Some(packet.header.timestamp);
        self.parts.extend_from_slice(&packet.payload);

        if packet.header.marker {
            self.current_ts = None;
            Some(std::mem::take(&mut self.parts))
        } else {
            None
        }
    }
}

struct IngestTask {
    eye: Eye,
    socket: Arc<UdpSocket>,
    caps: RtpCaps,
    resolution: CameraResolution,
    jitter_config: JitterConfig,
    clock: Arc<SyncedClock>,
    stats: Arc<FrameStats>,
    probe: Arc<dyn StageProbe>,
    sink: Arc<dyn FrameSink>,
    decoder: Box<dyn VideoDecoder>,
    events_tx: mpsc::Sender<PipelineEvent>,
    state: Arc<StateCell>,
}

/// One eye's RTP receive pipeline.
pub struct RtpIngest {
    config: IngestConfig,
    caps: RtpCaps,
    socket: Option<Arc<UdpSocket>>,
    clock: Arc<SyncedClock>,
    stats: Arc<FrameStats>,
    probe: Arc<dyn StageProbe>,
    sink: Arc<dyn FrameSink>,
    decoder: Option<Box<dyn VideoDecoder>>,
    events_tx: mpsc::Sender<PipelineEvent>,
    state: Arc<StateCell>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RtpIngest {
    /// Build the pipeline graph: bind the UDP source and move to Ready.
    ///
    /// The probe defaults to the stats recorder itself.
    ///
    /// # Errors
    /// Returns `IngestError::Configure` when the port cannot be bound;
    /// no resources are leaked.
    pub async fn configure(
        config: IngestConfig,
        clock: Arc<SyncedClock>,
        stats: Arc<FrameStats>,
        sink: Arc<dyn FrameSink>,
        decoder: Box<dyn VideoDecoder>,
        events_tx: mpsc::Sender<PipelineEvent>,
    ) -> Result<Self, IngestError> {
        let socket = UdpSocket::bind(("0.0.0.0", config.port)).await?;
        let caps = RtpCaps::for_stream(config.codec, &config.resolution);
        tracing::info!(eye = ?config.eye, port = config.port, caps = %caps, "ingest configured");

        Ok(Self {
            caps,
            socket: Some(Arc::new(socket)),
            clock,
            probe: stats.clone(),
            stats,
            sink,
            decoder: Some(decoder),
            events_tx,
            state: Arc::new(StateCell::new(IngestState::Ready)),
            shutdown_tx: None,
            handle: None,
            config,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> IngestState {
        self.state.get()
    }

    /// Which eye this pipeline feeds.
    #[must_use]
    pub fn eye(&self) -> Eye {
        self.config.eye
    }

    /// Port the UDP source actually bound (resolves port 0).
    #[must_use]
    pub fn local_port(&self) -> Option<u16> {
        let socket = self.socket.as_ref()?;
        socket.local_addr().ok().map(|addr| addr.port())
    }

    /// Replace the stage probe. Only legal before `play`.
    ///
    /// # Errors
    /// Returns `InvalidState` once the receive task is running.
    pub fn set_probe(&mut self, probe: Arc<dyn StageProbe>) -> Result<(), IngestError> {
        if self.state.get() != IngestState::Ready {
            return Err(IngestError::InvalidState(self.state.get()));
        }
        self.probe = probe;
        Ok(())
    }

    /// Start the receive task.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the pipeline is Ready.
    pub fn play(&mut self) -> Result<(), IngestError> {
        if self.state.get() != IngestState::Ready {
            return Err(IngestError::InvalidState(self.state.get()));
        }
        let socket = self
            .socket
            .clone()
            .ok_or(IngestError::InvalidState(IngestState::Null))?;
        let decoder = self
            .decoder
            .take()
            .ok_or(IngestError::InvalidState(IngestState::Null))?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = IngestTask {
            eye: self.config.eye,
            socket,
            caps: self.caps.clone(),
            resolution: self.config.resolution,
            jitter_config: self.config.jitter,
            clock: self.clock.clone(),
            stats: self.stats.clone(),
            probe: self.probe.clone(),
            sink: self.sink.clone(),
            decoder,
            events_tx: self.events_tx.clone(),
            state: self.state.clone(),
        };

        self.state.set(IngestState::Playing);
        let _ = self.events_tx.try_send(PipelineEvent::StateChanged {
            eye: self.config.eye,
            state: IngestState::Playing,
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.handle = Some(tokio::spawn(run_ingest(task, shutdown_rx)));
        Ok(())
    }

    /// Stop the receive task and release the socket.
    pub async fn teardown(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        self.socket = None;
        self.state.set(IngestState::Null);
        let _ = self.events_tx.try_send(PipelineEvent::StateChanged {
            eye: self.config.eye,
            state: IngestState::Null,
        });
    }
}

async fn run_ingest(mut task: IngestTask, mut shutdown_rx: mpsc::Receiver<()>) {
    let mut buf = vec![0u8; RECV_BUFFER_LEN];
    let mut jitter = RtpJitterBuffer::new(task.jitter_config);
    let mut assembler = FrameAssembler::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            result = task.socket.recv_from(&mut buf) => {
                let len = match result {
                    Ok((len, _src)) => len,
                    Err(e) => {
                        let _ = task.events_tx.send(PipelineEvent::Error {
                            eye: task.eye,
                            message: format!("UDP source failed: {e}"),
                        }).await;
                        task.state.set(IngestState::Null);
                        return;
                    }
                };

                if !handle_datagram(&mut task, &mut jitter, &mut assembler, &buf[..len]).await {
                    task.state.set(IngestState::Null);
                    return;
                }
            }
        }
    }

    task.state.set(IngestState::Null);
}

/// Process one datagram; returns false on a fatal decoder fault.
async fn handle_datagram(
    task: &mut IngestTask,
    jitter: &mut RtpJitterBuffer,
    assembler: &mut FrameAssembler,
    datagram: &[u8],
) -> bool {
    let packet = match RtpPacket::decode(Bytes::copy_from_slice(datagram)) {
        Ok(packet) => packet,
        Err(e) => {
            let _ = task.events_tx.try_send(PipelineEvent::Warning {
                eye: task.eye,
                message: format!("dropping malformed RTP packet: {e}"),
            });
            return true;
        }
    };

    if !task.caps.accepts(&packet.header) {
        tracing::trace!(
            eye = ?task.eye,
            payload_type = packet.header.payload_type,
            "payload type outside negotiated caps"
        );
        return true;
    }

    let meta = LatencyExtension::from_packet(&packet);
    task.probe.on_pass(
        Stage::UdpSrc,
        meta.as_ref(),
        task.clock.now_corrected_us(),
    );

    jitter.push(packet, Instant::now());

    while let Some(released) = jitter.pop(Instant::now()) {
        if released.lost_before > 0 {
            tracing::debug!(
                eye = ?task.eye,
                lost = released.lost_before,
                "skipping lost packets, discarding partial frame"
            );
            assembler.reset();
        }

        let Some(access_unit) = assembler.push(&released.packet) else {
            continue;
        };

        task.probe
            .on_pass(Stage::RtpDepay, None, task.clock.now_corrected_us());

        match task.decoder.decode(&access_unit) {
            Ok(frame) => {
                task.probe
                    .on_pass(Stage::Decode, None, task.clock.now_corrected_us());
                task.probe
                    .on_pass(Stage::Queue, None, task.clock.now_corrected_us());

                task.stats.record_delivery(task.clock.now_corrected_us());
                task.sink.on_frame(
                    task.eye,
                    &frame,
                    task.resolution.width,
                    task.resolution.height,
                );
            }
            Err(e) => {
                let _ = task.events_tx.send(PipelineEvent::Error {
                    eye: task.eye,
                    message: format!("decoder fault: {e}"),
                }).await;
                return false;
            }
        }
    }

    true
}
