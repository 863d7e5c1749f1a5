//! # telepresence
//!
//! Core runtime of a head-mounted stereoscopic telepresence client.
//!
//! The crate receives two live RTP/UDP video streams from a remote robot,
//! reassembles per-frame latency telemetry carried in RTP header
//! extensions, and hands decoded frames to a renderer-owned frame pair.
//! In the opposite direction it transmits the operator's head pose and
//! mobile-base velocity as small binary UDP datagrams, and answers the
//! robot's control polls with priority-collapsed servo commands. A
//! disciplined SNTP client keeps a shared microsecond clock so both ends
//! tag frames on the same timeline.
//!
//! ## Example
//!
//! ```rust,no_run
//! use telepresence::{StreamingConfig, TelepresenceClient};
//!
//! # async fn example() -> Result<(), telepresence::TelepresenceError> {
//! let config = StreamingConfig::builder()
//!     .peer_ip([192, 168, 1, 105].into())
//!     .build()?;
//!
//! let mut client = TelepresenceClient::start(config).await?;
//!
//! // Render loop reads client.frame_pair(), feeds poses...
//!
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// Core types
pub mod types;

pub mod control;
pub mod ingest;
pub mod protocol;
pub mod stats;
pub mod timing;
pub mod video;

mod client;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use client::TelepresenceClient;
pub use error::TelepresenceError;
pub use types::config::{
    Codec, IpOctets, MovementRange, CameraResolution, StreamingConfig, VideoMode,
};
pub use types::geometry::{AzimuthElevation, Quaternion};
