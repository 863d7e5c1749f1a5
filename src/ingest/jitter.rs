//! RTP jitter buffer.
//!
//! Reorders packets by sequence number under a fixed latency budget.
//! A packet missing once its successors have waited out the budget is
//! declared lost and skipped; packets arriving behind the playhead are
//! dropped. No retransmission.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::protocol::rtp::RtpPacket;

/// Jitter buffer tuning.
#[derive(Debug, Clone, Copy)]
pub struct JitterConfig {
    /// Reorder window: how long a gap may stall the stream.
    pub latency: Duration,
    /// Drop packets that arrive behind the playhead.
    pub drop_on_latency: bool,
    /// Skip over lost packets once the window expires.
    pub do_lost: bool,
    /// Hard cap on buffered packets.
    pub max_packets: usize,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(50),
            drop_on_latency: true,
            do_lost: true,
            max_packets: 512,
        }
    }
}

/// Outcome of offering a packet to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterPush {
    /// Packet queued for release.
    Buffered,
    /// Sequence number already buffered.
    Duplicate,
    /// Packet arrived behind the playhead.
    TooLate,
}

/// Counters for stream-health introspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JitterStats {
    /// Packets offered.
    pub packets_received: u64,
    /// Packets released in order.
    pub packets_released: u64,
    /// Packets skipped as lost.
    pub packets_lost: u64,
    /// Duplicate packets rejected.
    pub packets_duplicate: u64,
    /// Late packets rejected.
    pub packets_late: u64,
    /// Packets evicted by the depth cap.
    pub packets_dropped_overflow: u64,
    /// Current buffered depth.
    pub current_depth: usize,
    /// Deepest the buffer has been.
    pub max_depth_seen: usize,
}

/// A packet handed back by the buffer.
#[derive(Debug)]
pub struct ReleasedPacket {
    /// The packet, in release order.
    pub packet: RtpPacket,
    /// Sequence numbers declared lost immediately before this packet.
    pub lost_before: u16,
}

struct Entry {
    packet: RtpPacket,
    arrived: Instant,
}

/// Sequence-ordered packet buffer with a bounded reorder window.
pub struct RtpJitterBuffer {
    config: JitterConfig,
    /// Keyed by extended (unwrapped) sequence number.
    packets: BTreeMap<u64, Entry>,
    /// Last observed extended sequence, for unwrapping.
    last_extended: Option<(u16, u64)>,
    /// Next extended sequence due for release.
    next_seq: Option<u64>,
    stats: JitterStats,
}

impl RtpJitterBuffer {
    /// Create a buffer with the given tuning.
    #[must_use]
    pub fn new(config: JitterConfig) -> Self {
        Self {
            config,
            packets: BTreeMap::new(),
            last_extended: None,
            next_seq: None,
            stats: JitterStats::default(),
        }
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> JitterStats {
        let mut stats = self.stats;
        stats.current_depth = self.packets.len();
        stats
    }

    /// Unwrap a 16-bit sequence number onto the extended timeline.
    fn extend(&mut self, seq: u16) -> u64 {
        let extended = match self.last_extended {
            None => u64::from(seq),
            Some((last_seq, last_ext)) => {
                let delta = i64::from(seq.wrapping_sub(last_seq) as i16);
                last_ext.saturating_add_signed(delta)
            }
        };
        self.last_extended = Some((seq, extended));
        extended
    }

    /// Offer a packet.
    pub fn push(&mut self, packet: RtpPacket, arrived: Instant) -> JitterPush {
        self.stats.packets_received += 1;
        let extended = self.extend(packet.header.sequence);

        if self.config.drop_on_latency {
            if let Some(next) = self.next_seq {
                if extended < next {
                    self.stats.packets_late += 1;
                    return JitterPush::TooLate;
                }
            }
        }

        if self.packets.contains_key(&extended) {
            self.stats.packets_duplicate += 1;
            return JitterPush::Duplicate;
        }

        while self.packets.len() >= self.config.max_packets {
            self.packets.pop_first();
            self.stats.packets_dropped_overflow += 1;
        }

        self.packets.insert(extended, Entry { packet, arrived });
        self.stats.max_depth_seen = self.stats.max_depth_seen.max(self.packets.len());
        JitterPush::Buffered
    }

    /// Release the next in-order packet, or skip a gap whose head has
    /// waited out the latency budget.
    pub fn pop(&mut self, now: Instant) -> Option<ReleasedPacket> {
        let (&head_seq, head) = self.packets.first_key_value()?;

        let release = match self.next_seq {
            None => true,
            Some(next) if head_seq == next => true,
            Some(_) => {
                self.config.do_lost
                    && now.duration_since(head.arrived) >= self.config.latency
            }
        };
        if !release {
            return None;
        }

        let lost = self
            .next_seq
            .map_or(0, |next| head_seq.saturating_sub(next));
        self.stats.packets_lost += lost;
        self.stats.packets_released += 1;
        self.next_seq = Some(head_seq + 1);

        let entry = self
            .packets
            .remove(&head_seq)
            .expect("jitter buffer head vanished");
        #[allow(clippy::cast_possible_truncation)]
        let lost_before = lost.min(u64::from(u16::MAX)) as u16;
        Some(ReleasedPacket { packet: entry.packet, lost_before })
    }
}
