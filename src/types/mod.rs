//! Core types shared across the crate.

pub mod config;
pub mod geometry;

pub use config::{
    CameraResolution, Codec, ConfigError, IpOctets, MovementRange, StreamingConfig, VideoMode,
};
pub use geometry::{AzimuthElevation, Quaternion};

#[cfg(test)]
mod tests;
