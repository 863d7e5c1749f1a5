//! Per-eye frame statistics.
//!
//! Every frame that crosses the ingest pipeline leaves a trail of stage
//! durations and arrival timestamps here. Writers are the ingest
//! callbacks; readers are the HUD and the control link's latency report.
//! Fields are independent relaxed atomics: a snapshot may tear across
//! one frame under extreme contention, which is accepted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::protocol::rtp::LatencyExtension;

/// Depth of the averaging ring.
pub const HISTORY_SIZE: usize = 50;

/// Copyable snapshot of the live counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStatsSnapshot {
    /// Arrival timestamp of the previous delivered frame, corrected µs.
    pub prev_timestamp: u64,
    /// Arrival timestamp of the latest delivered frame, corrected µs.
    pub curr_timestamp: u64,
    /// Delivery rate derived from the last arrival interval.
    pub fps: f64,
    /// Sender-side video conversion duration, µs.
    pub vid_conv: u64,
    /// Sender-side encode duration, µs.
    pub enc: u64,
    /// Sender-side RTP payloading duration, µs.
    pub rtp_pay: u64,
    /// Network transit duration, µs.
    pub udp_stream: u64,
    /// RTP depacketization duration, µs.
    pub rtp_depay: u64,
    /// Decode duration, µs.
    pub dec: u64,
    /// Queue-to-sink duration, µs.
    pub queue: u64,
    /// Sender payloading wall-clock timestamp, corrected µs.
    pub rtp_pay_ts: u64,
    /// Arrival at the UDP source stage, corrected µs.
    pub udp_src_ts: u64,
    /// Arrival at the depacketizer stage, corrected µs.
    pub rtp_depay_ts: u64,
    /// Arrival at the decoder stage, corrected µs.
    pub dec_ts: u64,
    /// Arrival at the queue stage, corrected µs.
    pub queue_ts: u64,
    /// Glass-to-glass latency; zero until the queue stage has run.
    pub total_latency: u64,
    /// Producer-assigned frame identifier.
    pub frame_id: u64,
    /// RTP packets that made up the frame.
    pub packets_per_frame: u16,
    /// Timestamp of frame delivery to the sink, corrected µs.
    pub frame_ready_ts: u64,
    /// Timestamp the renderer presented the frame, corrected µs.
    pub presentation_ts: u64,
}

/// Live per-eye counters plus the averaging ring.
#[derive(Debug, Default)]
pub struct FrameStats {
    prev_timestamp: AtomicU64,
    curr_timestamp: AtomicU64,
    fps_bits: AtomicU64,
    vid_conv: AtomicU64,
    enc: AtomicU64,
    rtp_pay: AtomicU64,
    udp_stream: AtomicU64,
    rtp_depay: AtomicU64,
    dec: AtomicU64,
    queue: AtomicU64,
    rtp_pay_ts: AtomicU64,
    udp_src_ts: AtomicU64,
    rtp_depay_ts: AtomicU64,
    dec_ts: AtomicU64,
    queue_ts: AtomicU64,
    total_latency: AtomicU64,
    frame_id: AtomicU64,
    packets_per_frame: AtomicU16,
    packet_counter: AtomicU16,
    frame_ready_ts: AtomicU64,
    presentation_ts: AtomicU64,
    history: Mutex<VecDeque<FrameStatsSnapshot>>,
}

impl FrameStats {
    /// Create zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Best-effort copy of the live counters, no lock taken.
    #[must_use]
    pub fn snapshot(&self) -> FrameStatsSnapshot {
        FrameStatsSnapshot {
            prev_timestamp: self.prev_timestamp.load(Ordering::Relaxed),
            curr_timestamp: self.curr_timestamp.load(Ordering::Relaxed),
            fps: f64::from_bits(self.fps_bits.load(Ordering::Relaxed)),
            vid_conv: self.vid_conv.load(Ordering::Relaxed),
            enc: self.enc.load(Ordering::Relaxed),
            rtp_pay: self.rtp_pay.load(Ordering::Relaxed),
            udp_stream: self.udp_stream.load(Ordering::Relaxed),
            rtp_depay: self.rtp_depay.load(Ordering::Relaxed),
            dec: self.dec.load(Ordering::Relaxed),
            queue: self.queue.load(Ordering::Relaxed),
            rtp_pay_ts: self.rtp_pay_ts.load(Ordering::Relaxed),
            udp_src_ts: self.udp_src_ts.load(Ordering::Relaxed),
            rtp_depay_ts: self.rtp_depay_ts.load(Ordering::Relaxed),
            dec_ts: self.dec_ts.load(Ordering::Relaxed),
            queue_ts: self.queue_ts.load(Ordering::Relaxed),
            total_latency: self.total_latency.load(Ordering::Relaxed),
            frame_id: self.frame_id.load(Ordering::Relaxed),
            packets_per_frame: self.packets_per_frame.load(Ordering::Relaxed),
            frame_ready_ts: self.frame_ready_ts.load(Ordering::Relaxed),
            presentation_ts: self.presentation_ts.load(Ordering::Relaxed),
        }
    }

    /// Append the current snapshot to the ring, evicting the oldest
    /// entry beyond [`HISTORY_SIZE`].
    pub fn update_history(&self) {
        let snap = self.snapshot();
        let mut history = self.history.lock().expect("stats history mutex poisoned");
        history.push_back(snap);
        while history.len() > HISTORY_SIZE {
            history.pop_front();
        }
    }

    /// Number of snapshots currently in the ring.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.lock().expect("stats history mutex poisoned").len()
    }

    /// Snapshot averaged over the ring.
    ///
    /// Durations and fps are arithmetic means; identity fields and stage
    /// timestamps come from the most recent entry. An empty ring returns
    /// the live snapshot.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn averaged_snapshot(&self) -> FrameStatsSnapshot {
        let history = self.history.lock().expect("stats history mutex poisoned");
        let Some(latest) = history.back() else {
            drop(history);
            return self.snapshot();
        };

        let count = history.len() as u64;
        let mut avg = FrameStatsSnapshot::default();
        for snap in history.iter() {
            avg.fps += snap.fps;
            avg.vid_conv += snap.vid_conv;
            avg.enc += snap.enc;
            avg.rtp_pay += snap.rtp_pay;
            avg.udp_stream += snap.udp_stream;
            avg.rtp_depay += snap.rtp_depay;
            avg.dec += snap.dec;
            avg.queue += snap.queue;
            avg.total_latency += snap.total_latency;
        }
        avg.fps /= count as f64;
        avg.vid_conv /= count;
        avg.enc /= count;
        avg.rtp_pay /= count;
        avg.udp_stream /= count;
        avg.rtp_depay /= count;
        avg.dec /= count;
        avg.queue /= count;
        avg.total_latency /= count;

        avg.frame_id = latest.frame_id;
        avg.packets_per_frame = latest.packets_per_frame;
        avg.prev_timestamp = latest.prev_timestamp;
        avg.curr_timestamp = latest.curr_timestamp;
        avg.rtp_pay_ts = latest.rtp_pay_ts;
        avg.udp_src_ts = latest.udp_src_ts;
        avg.rtp_depay_ts = latest.rtp_depay_ts;
        avg.dec_ts = latest.dec_ts;
        avg.queue_ts = latest.queue_ts;
        avg.frame_ready_ts = latest.frame_ready_ts;
        avg.presentation_ts = latest.presentation_ts;

        avg
    }

    /// UDP-source handoff: fold in the sender's extension metadata and
    /// stamp the packet arrival.
    ///
    /// Runs once per RTP packet; the frame's last packet wins, which is
    /// the one the depacketizer completes on.
    pub fn record_ingress(&self, meta: &LatencyExtension, now_us: u64) {
        // A fresh packet invalidates the previous frame's total until
        // the queue stage recomputes it.
        self.total_latency.store(0, Ordering::Relaxed);

        if let Some(frame_id) = meta.frame_id {
            self.frame_id.store(frame_id, Ordering::Relaxed);
        }
        if let Some(vid_conv) = meta.vid_conv_us {
            self.vid_conv.store(vid_conv, Ordering::Relaxed);
        }
        if let Some(enc) = meta.enc_us {
            self.enc.store(enc, Ordering::Relaxed);
        }
        if let Some(rtp_pay) = meta.rtp_pay_us {
            self.rtp_pay.store(rtp_pay, Ordering::Relaxed);
        }
        if let Some(pay_wall) = meta.rtp_pay_wall_us {
            self.rtp_pay_ts.store(pay_wall, Ordering::Relaxed);
        }

        self.packet_counter.fetch_add(1, Ordering::Relaxed);
        self.udp_src_ts.store(now_us, Ordering::Relaxed);
        let pay_wall = self.rtp_pay_ts.load(Ordering::Relaxed);
        self.udp_stream
            .store(now_us.saturating_sub(pay_wall), Ordering::Relaxed);
    }

    /// Depacketizer handoff.
    pub fn record_depay(&self, now_us: u64) {
        self.rtp_depay_ts.store(now_us, Ordering::Relaxed);
        let udp_src = self.udp_src_ts.load(Ordering::Relaxed);
        self.rtp_depay
            .store(now_us.saturating_sub(udp_src), Ordering::Relaxed);
    }

    /// Decoder handoff.
    pub fn record_decode(&self, now_us: u64) {
        self.dec_ts.store(now_us, Ordering::Relaxed);
        let depay = self.rtp_depay_ts.load(Ordering::Relaxed);
        self.dec
            .store(now_us.saturating_sub(depay), Ordering::Relaxed);
    }

    /// Queue handoff: closes the frame, computes the total and pushes
    /// the snapshot into the ring.
    pub fn record_queue(&self, now_us: u64) {
        self.queue_ts.store(now_us, Ordering::Relaxed);
        let dec_ts = self.dec_ts.load(Ordering::Relaxed);
        let queue = now_us.saturating_sub(dec_ts);
        self.queue.store(queue, Ordering::Relaxed);

        let total = self.vid_conv.load(Ordering::Relaxed)
            + self.enc.load(Ordering::Relaxed)
            + self.rtp_pay.load(Ordering::Relaxed)
            + self.udp_stream.load(Ordering::Relaxed)
            + self.rtp_depay.load(Ordering::Relaxed)
            + self.dec.load(Ordering::Relaxed)
            + queue;
        self.total_latency.store(total, Ordering::Relaxed);

        let packets = self.packet_counter.swap(0, Ordering::Relaxed);
        self.packets_per_frame.store(packets, Ordering::Relaxed);

        self.update_history();
    }

    /// Sink delivery: advance the arrival interval and derive fps.
    ///
    /// An interval of zero (two frames with identical arrival stamps)
    /// leaves the previous fps value in place.
    pub fn record_delivery(&self, now_us: u64) {
        let prev = self.curr_timestamp.swap(now_us, Ordering::Relaxed);
        self.prev_timestamp.store(prev, Ordering::Relaxed);
        self.frame_ready_ts.store(now_us, Ordering::Relaxed);

        let interval = now_us.saturating_sub(prev);
        if prev != 0 && interval > 0 {
            #[allow(clippy::cast_precision_loss)]
            let fps = 1e6 / interval as f64;
            self.fps_bits.store(fps.to_bits(), Ordering::Relaxed);
        }
    }

    /// Record the renderer presenting the current frame.
    pub fn mark_presented(&self, now_us: u64) {
        self.presentation_ts.store(now_us, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests;
