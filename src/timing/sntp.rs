//! SNTPv4 client wire format (RFC 4330).

use byteorder::{BigEndian, ByteOrder};

use super::sync::SyncError;

/// SNTP packet length.
pub const PACKET_LEN: usize = 48;

/// Well-known NTP server port.
pub const NTP_PORT: u16 = 123;

/// Seconds between the NTP epoch (1900) and the UNIX epoch (1970).
pub const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// Samples with a round trip above this are rejected as congested.
pub const MAX_SAMPLE_RTT_US: u64 = 20_000;

/// One offset measurement against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpSample {
    /// Candidate offset `local - server`, microseconds.
    pub offset_us: i64,
    /// Round-trip time of the exchange, microseconds.
    pub rtt_us: u64,
}

impl NtpSample {
    /// Whether the sample passes outlier rejection (`rtt <= 20 ms`).
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        self.rtt_us <= MAX_SAMPLE_RTT_US
    }
}

/// Pick the sample with the smallest round trip; first wins ties.
#[must_use]
pub fn best_sample(samples: &[NtpSample]) -> Option<&NtpSample> {
    let mut best: Option<&NtpSample> = None;
    for sample in samples {
        if best.is_none_or(|b| sample.rtt_us < b.rtt_us) {
            best = Some(sample);
        }
    }
    best
}

/// Build a client-mode request packet.
///
/// First byte is `LI=3` (unsynchronized), `VN=4`, `Mode=3` (client);
/// everything else stays zero.
#[must_use]
pub fn client_request() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = 0b1110_0011;
    packet
}

/// Extract the server transmit timestamp from a response, as
/// microseconds since the UNIX epoch.
///
/// The timestamp sits in bytes 40..48: big-endian seconds since 1900,
/// then a big-endian 32-bit binary fraction of a second.
///
/// # Errors
/// Returns `SyncError::BadResponse` for responses shorter than 48 bytes.
pub fn transmit_time_us(response: &[u8]) -> Result<u64, SyncError> {
    if response.len() < PACKET_LEN {
        return Err(SyncError::BadResponse(response.len()));
    }

    let seconds = u64::from(BigEndian::read_u32(&response[40..44]));
    let fraction = u64::from(BigEndian::read_u32(&response[44..48]));

    let unix_seconds = seconds.saturating_sub(NTP_UNIX_OFFSET_SECS);
    let micros = (fraction * 1_000_000) >> 32;
    Ok(unix_seconds * 1_000_000 + micros)
}
