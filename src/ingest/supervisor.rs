//! Lifecycle of the two eye pipelines.
//!
//! Owns the ingest instances and the frame pair they feed. Reconfiguring
//! tears the old pipelines down to Null, zero-fills the buffers at the
//! new geometry, attaches fresh statistics and starts new pipelines. A
//! single background task pumps both pipelines' asynchronous events into
//! the logger.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::pipeline::{IngestConfig, IngestState, RtpIngest};
use super::IngestError;
use crate::stats::FrameStats;
use crate::timing::SyncedClock;
use crate::types::config::{StreamingConfig, VideoMode};
use crate::video::decoder::{raw_rgb_factory, DecoderFactory};
use crate::video::frame::{Eye, FramePair};

/// Asynchronous pipeline notifications, fanned into one logger.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Lifecycle transition.
    StateChanged {
        /// Originating pipeline.
        eye: Eye,
        /// New state.
        state: IngestState,
    },
    /// Informational message.
    Info {
        /// Originating pipeline.
        eye: Eye,
        /// Message text.
        message: String,
    },
    /// Recoverable anomaly.
    Warning {
        /// Originating pipeline.
        eye: Eye,
        /// Message text.
        message: String,
    },
    /// Fatal pipeline fault; the pipeline has torn down to Null.
    Error {
        /// Originating pipeline.
        eye: Eye,
        /// Message text.
        message: String,
    },
}

/// Owns and reconfigures the per-eye ingest pipelines.
pub struct PipelineSupervisor {
    clock: Arc<SyncedClock>,
    frame_pair: Arc<FramePair>,
    ingests: Vec<RtpIngest>,
    decoder_factory: DecoderFactory,
    events_tx: mpsc::Sender<PipelineEvent>,
    event_shutdown_tx: mpsc::Sender<()>,
    event_task: Option<JoinHandle<()>>,
}

impl PipelineSupervisor {
    /// Create an idle supervisor with the passthrough decoder factory.
    #[must_use]
    pub fn new(clock: Arc<SyncedClock>) -> Self {
        Self::with_decoder_factory(clock, raw_rgb_factory())
    }

    /// Create an idle supervisor with a custom decoder factory.
    #[must_use]
    pub fn with_decoder_factory(clock: Arc<SyncedClock>, decoder_factory: DecoderFactory) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (event_shutdown_tx, event_shutdown_rx) = mpsc::channel(1);
        let event_task = tokio::spawn(run_event_loop(events_rx, event_shutdown_rx));

        Self {
            clock,
            frame_pair: Arc::new(FramePair::new(&crate::types::config::CameraResolution::default())),
            ingests: Vec::new(),
            decoder_factory,
            events_tx,
            event_shutdown_tx,
            event_task: Some(event_task),
        }
    }

    /// The frame pair the renderer reads. Stable across reconfigures.
    #[must_use]
    pub fn frame_pair(&self) -> Arc<FramePair> {
        self.frame_pair.clone()
    }

    /// Statistics of one eye's current stream.
    #[must_use]
    pub fn stats(&self, eye: Eye) -> Arc<FrameStats> {
        self.frame_pair.eye(eye).stats()
    }

    /// States of the running pipelines, left first.
    #[must_use]
    pub fn pipeline_states(&self) -> Vec<IngestState> {
        self.ingests.iter().map(RtpIngest::state).collect()
    }

    /// Ports the pipelines actually bound, left first.
    #[must_use]
    pub fn bound_ports(&self) -> Vec<u16> {
        self.ingests.iter().filter_map(RtpIngest::local_port).collect()
    }

    /// (Re)configure both pipelines for a session.
    ///
    /// Existing pipelines are torn down first; the renderer may observe
    /// one black frame while the buffers are re-zeroed. In Mono mode a
    /// single left pipeline feeds both eyes.
    ///
    /// # Errors
    /// Returns `IngestError::Configure` when a socket cannot be bound;
    /// the pipelines are left torn down.
    pub async fn configure(&mut self, config: &StreamingConfig) -> Result<(), IngestError> {
        tracing::info!(
            codec = config.codec.encoding_name(),
            resolution = config.resolution.label,
            mode = ?config.video_mode,
            "(re)configuring ingest pipelines"
        );

        // 1. Stop and drop the old instances.
        for ingest in self.ingests.drain(..) {
            ingest.teardown().await;
        }

        // 2-3. Fresh zeroed buffers and statistics.
        let left_stats = Arc::new(FrameStats::new());
        let right_stats = Arc::new(FrameStats::new());
        let mirror = config.video_mode == VideoMode::Mono;
        self.frame_pair
            .reconfigure(&config.resolution, left_stats.clone(), right_stats, mirror);

        // 4. Build and start the new instances.
        let eyes: &[(Eye, u16)] = match config.video_mode {
            VideoMode::Stereo => &[(Eye::Left, config.port_left), (Eye::Right, config.port_right)],
            VideoMode::Mono => &[(Eye::Left, config.port_left)],
        };

        for &(eye, port) in eyes {
            let ingest_config = IngestConfig {
                eye,
                port,
                codec: config.codec,
                resolution: config.resolution,
                jitter: super::jitter::JitterConfig::default(),
            };
            let decoder = (self.decoder_factory.as_ref())(config.codec, &config.resolution);
            let mut ingest = RtpIngest::configure(
                ingest_config,
                self.clock.clone(),
                self.frame_pair.eye(eye).stats(),
                self.frame_pair.clone(),
                decoder,
                self.events_tx.clone(),
            )
            .await?;
            ingest.play()?;
            self.ingests.push(ingest);
        }

        Ok(())
    }

    /// Stop the event loop, then tear down the pipelines.
    pub async fn shutdown(&mut self) {
        let _ = self.event_shutdown_tx.send(()).await;
        if let Some(handle) = self.event_task.take() {
            let _ = handle.await;
        }
        for ingest in self.ingests.drain(..) {
            ingest.teardown().await;
        }
    }
}

async fn run_event_loop(
    mut events_rx: mpsc::Receiver<PipelineEvent>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    Some(PipelineEvent::StateChanged { eye, state }) => {
                        tracing::info!(?eye, ?state, "pipeline state changed");
                    }
                    Some(PipelineEvent::Info { eye, message }) => {
                        tracing::info!(?eye, "{message}");
                    }
                    Some(PipelineEvent::Warning { eye, message }) => {
                        tracing::warn!(?eye, "{message}");
                    }
                    Some(PipelineEvent::Error { eye, message }) => {
                        tracing::error!(?eye, "{message}");
                    }
                    None => break,
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}
