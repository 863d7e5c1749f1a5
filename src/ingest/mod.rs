//! Per-eye RTP receive pipelines.
//!
//! Each eye runs one pipeline: UDP source, jitter buffer, frame
//! reassembly, decode, delivery into the shared frame pair. Four tagged
//! probe points along the way feed the per-frame latency accounting.

pub mod jitter;
pub mod pipeline;
pub mod supervisor;

pub use jitter::{JitterConfig, JitterPush, JitterStats, ReleasedPacket, RtpJitterBuffer};
pub use pipeline::{IngestConfig, IngestState, RtpIngest};
pub use supervisor::{PipelineEvent, PipelineSupervisor};

use crate::protocol::rtp::LatencyExtension;
use crate::stats::FrameStats;

/// The tagged handoff points of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Packet left the UDP source.
    UdpSrc,
    /// Access unit left the depacketizer.
    RtpDepay,
    /// Frame left the decoder.
    Decode,
    /// Frame left the presentation queue.
    Queue,
}

/// Receives a timestamped callback at every stage handoff.
///
/// The stats recorder is the production implementation; tests inject
/// their own to observe probe ordering.
pub trait StageProbe: Send + Sync {
    /// Called once per handoff with the corrected-clock arrival time.
    /// `meta` is present only at the UDP source, where the sender's
    /// extension entries ride on the packet.
    fn on_pass(&self, stage: Stage, meta: Option<&LatencyExtension>, now_us: u64);
}

impl StageProbe for FrameStats {
    fn on_pass(&self, stage: Stage, meta: Option<&LatencyExtension>, now_us: u64) {
        match stage {
            Stage::UdpSrc => {
                let default = LatencyExtension::default();
                self.record_ingress(meta.unwrap_or(&default), now_us);
            }
            Stage::RtpDepay => self.record_depay(now_us),
            Stage::Decode => self.record_decode(now_us),
            Stage::Queue => self.record_queue(now_us),
        }
    }
}

/// Errors from pipeline configuration and runtime.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The pipeline graph could not be built (socket bind failure).
    #[error("pipeline configuration rejected: {0}")]
    Configure(#[from] std::io::Error),

    /// A fault while playing; the pipeline tears down to Null.
    #[error("pipeline runtime fault: {0}")]
    Runtime(String),

    /// Operation not legal in the current state.
    #[error("operation invalid in pipeline state {0:?}")]
    InvalidState(IngestState),
}

#[cfg(test)]
mod tests;
