//! Servo control protocol.
//!
//! Little-endian, request/response framing spoken on the control link.
//! Every outbound message starts with a one-byte type; servo commands
//! follow with the `0x47 0x54` identifier pair and one or more command
//! segments addressed by (operation, group, element).

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::stats::FrameStatsSnapshot;

/// Message type: servo command.
pub const MSG_SERVO_COMMAND: u8 = 0x01;
/// Message type: latency log.
pub const MSG_LOG: u8 = 0x02;
/// Message type: empty reply.
pub const MSG_EMPTY: u8 = 0x03;

/// First identifier byte of a servo command.
pub const IDENTIFIER_1: u8 = 0x47;
/// Second identifier byte of a servo command.
pub const IDENTIFIER_2: u8 = 0x54;

/// Enable-group value that clears latched drive errors.
pub const RESET_ERRORS_VALUE: i32 = 0x08;

/// Servo operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    /// Read a register.
    Read = 0x01,
    /// Write a register once.
    Write = 0x02,
    /// Continuous write (streamed setpoints).
    WriteContinuous = 0x04,
}

impl Operation {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Read),
            0x02 => Some(Self::Write),
            0x04 => Some(Self::WriteContinuous),
            _ => None,
        }
    }
}

/// Servo register groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageGroup {
    /// Elevation drive enable block.
    EnableElevation = 0x11,
    /// Azimuth drive enable block.
    EnableAzimuth = 0x12,
    /// Elevation motion block.
    Elevation = 0x19,
    /// Azimuth motion block.
    Azimuth = 0x1A,
}

impl MessageGroup {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x11 => Some(Self::EnableElevation),
            0x12 => Some(Self::EnableAzimuth),
            0x19 => Some(Self::Elevation),
            0x1A => Some(Self::Azimuth),
            _ => None,
        }
    }
}

/// Servo register elements. `Enable` and `Acceleration` share a code;
/// the group disambiguates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageElement {
    /// Drive enable (in enable groups) / acceleration (in motion groups).
    Enable = 0x00,
    /// Deceleration.
    Deceleration = 0x01,
    /// Angle setpoint.
    Angle = 0x04,
    /// Speed limit.
    Speed = 0x07,
    /// Control mode.
    Mode = 0x09,
}

/// Alias: acceleration shares the `0x00` element code.
pub const ELEMENT_ACCELERATION: MessageElement = MessageElement::Enable;

impl MessageElement {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::Enable),
            0x01 => Some(Self::Deceleration),
            0x04 => Some(Self::Angle),
            0x07 => Some(Self::Speed),
            0x09 => Some(Self::Mode),
            _ => None,
        }
    }
}

/// Filtered pose setpoint in servo hardware units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseTarget {
    /// Azimuth angle word.
    pub azimuth: i32,
    /// Azimuth revolution word (-1 below zero, else 0).
    pub azimuth_revol: i32,
    /// Elevation angle word.
    pub elevation: i32,
    /// Elevation revolution word.
    pub elevation_revol: i32,
}

/// Decoded pose-and-speed packet contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseAndSpeed {
    /// Pose setpoint.
    pub target: PoseTarget,
    /// Speed limit applied to both axes.
    pub speed: i32,
}

/// Latency report carried in a `0x02` log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyReport {
    /// Video conversion duration, µs.
    pub vid_conv: i32,
    /// Encode duration, µs.
    pub enc: i32,
    /// RTP payloading duration, µs.
    pub rtp_pay: i32,
    /// Network transit duration, µs.
    pub udp_stream: i32,
    /// Depacketization duration, µs.
    pub rtp_depay: i32,
    /// Decode duration, µs.
    pub dec: i32,
}

impl From<&FrameStatsSnapshot> for LatencyReport {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn from(snap: &FrameStatsSnapshot) -> Self {
        Self {
            vid_conv: snap.vid_conv as i32,
            enc: snap.enc as i32,
            rtp_pay: snap.rtp_pay as i32,
            udp_stream: snap.udp_stream as i32,
            rtp_depay: snap.rtp_depay as i32,
            dec: snap.dec as i32,
        }
    }
}

fn push_i32(buf: &mut Vec<u8>, value: i32) {
    let mut word = [0u8; 4];
    LittleEndian::write_i32(&mut word, value);
    buf.extend_from_slice(&word);
}

fn push_segment_header(buf: &mut Vec<u8>, op: Operation, group: MessageGroup, elem: MessageElement) {
    buf.push(op as u8);
    buf.push(group as u8);
    buf.push(elem as u8);
}

/// The single-byte empty reply.
#[must_use]
pub fn empty_message() -> Vec<u8> {
    vec![MSG_EMPTY]
}

/// Latency log message: type byte plus six `i32` durations.
#[must_use]
pub fn latency_message(report: &LatencyReport) -> Vec<u8> {
    let mut buf = Vec::with_capacity(25);
    buf.push(MSG_LOG);
    push_i32(&mut buf, report.vid_conv);
    push_i32(&mut buf, report.enc);
    push_i32(&mut buf, report.rtp_pay);
    push_i32(&mut buf, report.udp_stream);
    push_i32(&mut buf, report.rtp_depay);
    push_i32(&mut buf, report.dec);
    buf
}

/// Set both axes to position mode.
#[must_use]
pub fn set_mode_message() -> Vec<u8> {
    let mut buf = vec![MSG_SERVO_COMMAND, IDENTIFIER_1, IDENTIFIER_2];
    push_segment_header(&mut buf, Operation::Write, MessageGroup::Azimuth, MessageElement::Mode);
    push_i32(&mut buf, 0x01);
    push_segment_header(&mut buf, Operation::Write, MessageGroup::Elevation, MessageElement::Mode);
    push_i32(&mut buf, 0x01);
    buf
}

/// Enable or disable both drives.
#[must_use]
pub fn enable_servos_message(enable: bool) -> Vec<u8> {
    write_enable_groups(i32::from(enable))
}

/// Clear latched drive errors on both axes.
#[must_use]
pub fn reset_errors_message() -> Vec<u8> {
    write_enable_groups(RESET_ERRORS_VALUE)
}

fn write_enable_groups(value: i32) -> Vec<u8> {
    let mut buf = vec![MSG_SERVO_COMMAND, IDENTIFIER_1, IDENTIFIER_2];
    push_segment_header(&mut buf, Operation::Write, MessageGroup::EnableAzimuth, MessageElement::Enable);
    push_i32(&mut buf, value);
    push_segment_header(&mut buf, Operation::Write, MessageGroup::EnableElevation, MessageElement::Enable);
    push_i32(&mut buf, value);
    buf
}

/// Set the acceleration limit on both axes.
#[must_use]
pub fn acceleration_message(acceleration: i32) -> Vec<u8> {
    write_motion_groups(ELEMENT_ACCELERATION, acceleration)
}

/// Set the deceleration limit on both axes.
#[must_use]
pub fn deceleration_message(deceleration: i32) -> Vec<u8> {
    write_motion_groups(MessageElement::Deceleration, deceleration)
}

fn write_motion_groups(elem: MessageElement, value: i32) -> Vec<u8> {
    let mut buf = vec![MSG_SERVO_COMMAND, IDENTIFIER_1, IDENTIFIER_2];
    push_segment_header(&mut buf, Operation::Write, MessageGroup::Azimuth, elem);
    push_i32(&mut buf, value);
    push_segment_header(&mut buf, Operation::Write, MessageGroup::Elevation, elem);
    push_i32(&mut buf, value);
    buf
}

/// The full pose-and-speed command: continuous angle writes for both
/// axes, speed limits, and drive enables, in that order.
///
/// `axes_swapped` exchanges the two (angle, revolution) pairs for heads
/// wired with the drives transposed.
#[must_use]
pub fn pose_and_speed_message(target: &PoseTarget, speed: i32, axes_swapped: bool) -> Vec<u8> {
    let (az, az_revol, el, el_revol) = if axes_swapped {
        (target.elevation, target.elevation_revol, target.azimuth, target.azimuth_revol)
    } else {
        (target.azimuth, target.azimuth_revol, target.elevation, target.elevation_revol)
    };

    let mut buf = Vec::with_capacity(49);
    buf.push(MSG_SERVO_COMMAND);
    buf.push(IDENTIFIER_1);
    buf.push(IDENTIFIER_2);

    push_segment_header(&mut buf, Operation::WriteContinuous, MessageGroup::Azimuth, MessageElement::Angle);
    buf.push(0x02);
    push_i32(&mut buf, az);
    push_i32(&mut buf, az_revol);

    push_segment_header(&mut buf, Operation::WriteContinuous, MessageGroup::Elevation, MessageElement::Angle);
    buf.push(0x02);
    push_i32(&mut buf, el);
    push_i32(&mut buf, el_revol);

    push_segment_header(&mut buf, Operation::Write, MessageGroup::Azimuth, MessageElement::Speed);
    push_i32(&mut buf, speed);
    push_segment_header(&mut buf, Operation::Write, MessageGroup::Elevation, MessageElement::Speed);
    push_i32(&mut buf, speed);

    push_segment_header(&mut buf, Operation::Write, MessageGroup::EnableAzimuth, MessageElement::Enable);
    push_i32(&mut buf, 0x01);
    push_segment_header(&mut buf, Operation::Write, MessageGroup::EnableElevation, MessageElement::Enable);
    push_i32(&mut buf, 0x01);

    buf
}

/// Errors from decoding control-link messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServoDecodeError {
    /// Empty buffer.
    #[error("empty message")]
    Empty,

    /// Unknown message type byte.
    #[error("unknown message type: {0:#04x}")]
    UnknownType(u8),

    /// Servo command without the identifier pair.
    #[error("missing servo command identifiers")]
    BadIdentifiers,

    /// Segment header carried unknown codes.
    #[error("invalid segment at offset {0}")]
    BadSegment(usize),

    /// Buffer ended inside a segment.
    #[error("truncated message")]
    Truncated,
}

/// One decoded command segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSegment {
    /// Operation code.
    pub operation: Operation,
    /// Register group.
    pub group: MessageGroup,
    /// Register element.
    pub element: MessageElement,
    /// Register value (angle word for continuous angle writes).
    pub value: i32,
    /// Revolution word, present on continuous angle writes.
    pub revolutions: Option<i32>,
}

/// A decoded control-link message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServoMessage {
    /// Empty reply.
    Empty,
    /// Latency log.
    Latency(LatencyReport),
    /// Servo command segments in wire order.
    Command(Vec<CommandSegment>),
}

/// Decode an outbound control-link message.
///
/// # Errors
/// Returns `ServoDecodeError` on unknown types, missing identifiers or
/// truncated segments.
pub fn decode_message(buf: &[u8]) -> Result<ServoMessage, ServoDecodeError> {
    let (&msg_type, body) = buf.split_first().ok_or(ServoDecodeError::Empty)?;
    match msg_type {
        MSG_EMPTY => Ok(ServoMessage::Empty),
        MSG_LOG => decode_latency(body),
        MSG_SERVO_COMMAND => decode_command(body),
        other => Err(ServoDecodeError::UnknownType(other)),
    }
}

fn decode_latency(body: &[u8]) -> Result<ServoMessage, ServoDecodeError> {
    if body.len() < 24 {
        return Err(ServoDecodeError::Truncated);
    }
    Ok(ServoMessage::Latency(LatencyReport {
        vid_conv: LittleEndian::read_i32(&body[0..4]),
        enc: LittleEndian::read_i32(&body[4..8]),
        rtp_pay: LittleEndian::read_i32(&body[8..12]),
        udp_stream: LittleEndian::read_i32(&body[12..16]),
        rtp_depay: LittleEndian::read_i32(&body[16..20]),
        dec: LittleEndian::read_i32(&body[20..24]),
    }))
}

fn decode_command(body: &[u8]) -> Result<ServoMessage, ServoDecodeError> {
    if body.len() < 2 || body[0] != IDENTIFIER_1 || body[1] != IDENTIFIER_2 {
        return Err(ServoDecodeError::BadIdentifiers);
    }

    let mut segments = Vec::new();
    let mut offset = 2;
    while offset < body.len() {
        if offset + 3 > body.len() {
            return Err(ServoDecodeError::Truncated);
        }
        let operation =
            Operation::from_byte(body[offset]).ok_or(ServoDecodeError::BadSegment(offset))?;
        let group =
            MessageGroup::from_byte(body[offset + 1]).ok_or(ServoDecodeError::BadSegment(offset))?;
        let element = MessageElement::from_byte(body[offset + 2])
            .ok_or(ServoDecodeError::BadSegment(offset))?;
        offset += 3;

        let continuous_angle =
            operation == Operation::WriteContinuous && element == MessageElement::Angle;
        if continuous_angle {
            // Count byte, then angle and revolution words.
            if offset + 9 > body.len() {
                return Err(ServoDecodeError::Truncated);
            }
            offset += 1;
            let value = LittleEndian::read_i32(&body[offset..offset + 4]);
            let revolutions = LittleEndian::read_i32(&body[offset + 4..offset + 8]);
            offset += 8;
            segments.push(CommandSegment {
                operation,
                group,
                element,
                value,
                revolutions: Some(revolutions),
            });
        } else {
            if offset + 4 > body.len() {
                return Err(ServoDecodeError::Truncated);
            }
            let value = LittleEndian::read_i32(&body[offset..offset + 4]);
            offset += 4;
            segments.push(CommandSegment {
                operation,
                group,
                element,
                value,
                revolutions: None,
            });
        }
    }

    Ok(ServoMessage::Command(segments))
}

/// Decode a pose-and-speed packet back into its setpoint.
///
/// # Errors
/// Returns `ServoDecodeError::Truncated` if the expected six segments
/// are not all present.
pub fn decode_pose_and_speed(buf: &[u8]) -> Result<PoseAndSpeed, ServoDecodeError> {
    let ServoMessage::Command(segments) = decode_message(buf)? else {
        return Err(ServoDecodeError::Truncated);
    };

    let mut azimuth = None;
    let mut elevation = None;
    let mut speed = None;
    for segment in &segments {
        match (segment.operation, segment.group, segment.element) {
            (Operation::WriteContinuous, MessageGroup::Azimuth, MessageElement::Angle) => {
                azimuth = Some((segment.value, segment.revolutions.unwrap_or(0)));
            }
            (Operation::WriteContinuous, MessageGroup::Elevation, MessageElement::Angle) => {
                elevation = Some((segment.value, segment.revolutions.unwrap_or(0)));
            }
            (Operation::Write, MessageGroup::Azimuth, MessageElement::Speed) => {
                speed = Some(segment.value);
            }
            _ => {}
        }
    }

    let ((az, az_revol), (el, el_revol), speed) = azimuth
        .zip(elevation)
        .zip(speed)
        .map(|((a, e), s)| (a, e, s))
        .ok_or(ServoDecodeError::Truncated)?;

    Ok(PoseAndSpeed {
        target: PoseTarget {
            azimuth: az,
            azimuth_revol: az_revol,
            elevation: el,
            elevation_revol: el_revol,
        },
        speed,
    })
}
