//! Fire-and-forget robot-control datagrams.
//!
//! Two fixed 21-byte packet types, little-endian throughout:
//!
//! `0x01` head pose — `[type][azimuth f32][elevation f32][speed f32][timestamp u64]`
//! `0x02` robot control — `[type][lin_x f32][lin_y f32][angular f32][timestamp u64]`
//!
//! The receiving server maps these onto its own robot hardware; nothing
//! here couples the headset to a specific base.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// Head-pose message type byte.
pub const MSG_HEAD_POSE: u8 = 0x01;
/// Robot-control message type byte.
pub const MSG_ROBOT_CONTROL: u8 = 0x02;
/// Fixed length of both packet types.
pub const PACKET_LEN: usize = 21;

/// Errors from datagram decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatagramDecodeError {
    /// Wrong packet length.
    #[error("bad datagram length: {0}")]
    BadLength(usize),

    /// Unknown type byte.
    #[error("unknown datagram type: {0:#04x}")]
    UnknownType(u8),
}

/// Operator head orientation sent each rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    /// Azimuth, radians.
    pub azimuth: f32,
    /// Elevation, radians.
    pub elevation: f32,
    /// Normalized movement speed.
    pub speed: f32,
    /// Corrected-clock timestamp, µs.
    pub timestamp_us: u64,
}

impl HeadPose {
    /// Encode to the 21-byte wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buf = [0u8; PACKET_LEN];
        buf[0] = MSG_HEAD_POSE;
        LittleEndian::write_f32(&mut buf[1..5], self.azimuth);
        LittleEndian::write_f32(&mut buf[5..9], self.elevation);
        LittleEndian::write_f32(&mut buf[9..13], self.speed);
        LittleEndian::write_u64(&mut buf[13..21], self.timestamp_us);
        buf
    }

    /// Decode from wire bytes.
    ///
    /// # Errors
    /// Returns `DatagramDecodeError` on wrong length or type.
    pub fn decode(buf: &[u8]) -> Result<Self, DatagramDecodeError> {
        if buf.len() != PACKET_LEN {
            return Err(DatagramDecodeError::BadLength(buf.len()));
        }
        if buf[0] != MSG_HEAD_POSE {
            return Err(DatagramDecodeError::UnknownType(buf[0]));
        }
        Ok(Self {
            azimuth: LittleEndian::read_f32(&buf[1..5]),
            elevation: LittleEndian::read_f32(&buf[5..9]),
            speed: LittleEndian::read_f32(&buf[9..13]),
            timestamp_us: LittleEndian::read_u64(&buf[13..21]),
        })
    }
}

/// Mobile-base velocity command sent each rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotControl {
    /// Forward linear velocity.
    pub linear_x: f32,
    /// Lateral linear velocity.
    pub linear_y: f32,
    /// Angular velocity.
    pub angular: f32,
    /// Corrected-clock timestamp, µs.
    pub timestamp_us: u64,
}

impl RobotControl {
    /// Encode to the 21-byte wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buf = [0u8; PACKET_LEN];
        buf[0] = MSG_ROBOT_CONTROL;
        LittleEndian::write_f32(&mut buf[1..5], self.linear_x);
        LittleEndian::write_f32(&mut buf[5..9], self.linear_y);
        LittleEndian::write_f32(&mut buf[9..13], self.angular);
        LittleEndian::write_u64(&mut buf[13..21], self.timestamp_us);
        buf
    }

    /// Decode from wire bytes.
    ///
    /// # Errors
    /// Returns `DatagramDecodeError` on wrong length or type.
    pub fn decode(buf: &[u8]) -> Result<Self, DatagramDecodeError> {
        if buf.len() != PACKET_LEN {
            return Err(DatagramDecodeError::BadLength(buf.len()));
        }
        if buf[0] != MSG_ROBOT_CONTROL {
            return Err(DatagramDecodeError::UnknownType(buf[0]));
        }
        Ok(Self {
            linear_x: LittleEndian::read_f32(&buf[1..5]),
            linear_y: LittleEndian::read_f32(&buf[5..9]),
            angular: LittleEndian::read_f32(&buf[9..13]),
            timestamp_us: LittleEndian::read_u64(&buf[13..21]),
        })
    }
}

#[cfg(test)]
mod tests;
