use crate::protocol::rtp::LatencyExtension;
use crate::stats::{FrameStats, HISTORY_SIZE};

fn sender_meta(frame_id: u64, vid_conv: u64, enc: u64, rtp_pay: u64, pay_wall: u64) -> LatencyExtension {
    LatencyExtension {
        frame_id: Some(frame_id),
        vid_conv_us: Some(vid_conv),
        enc_us: Some(enc),
        rtp_pay_us: Some(rtp_pay),
        rtp_pay_wall_us: Some(pay_wall),
    }
}

/// Drives one frame through all four stage handoffs with fixed clock
/// readings.
fn run_frame(stats: &FrameStats, meta: &LatencyExtension, stamps: [u64; 4]) {
    stats.record_ingress(meta, stamps[0]);
    stats.record_depay(stamps[1]);
    stats.record_decode(stamps[2]);
    stats.record_queue(stamps[3]);
}

#[test]
fn test_single_healthy_frame_accounting() {
    let stats = FrameStats::new();
    let meta = sender_meta(42, 3000, 8000, 1000, 1_000_000_000);

    run_frame(
        &stats,
        &meta,
        [1_000_007_000, 1_000_009_000, 1_000_025_000, 1_000_026_000],
    );

    let snap = stats.snapshot();
    assert_eq!(snap.frame_id, 42);
    assert_eq!(snap.udp_stream, 7000);
    assert_eq!(snap.rtp_depay, 2000);
    assert_eq!(snap.dec, 16000);
    assert_eq!(snap.queue, 1000);
    assert_eq!(
        snap.total_latency,
        snap.vid_conv + snap.enc + snap.rtp_pay + snap.udp_stream
            + snap.rtp_depay + snap.dec + snap.queue
    );
    assert_eq!(snap.total_latency, 38_000);
    assert_eq!(snap.packets_per_frame, 1);
    assert_eq!(stats.history_len(), 1);
}

#[test]
fn test_total_latency_zero_until_queue_stage() {
    let stats = FrameStats::new();
    let meta = sender_meta(1, 100, 100, 100, 1_000_000);

    stats.record_ingress(&meta, 1_000_500);
    assert_eq!(stats.snapshot().total_latency, 0);
    stats.record_depay(1_000_600);
    assert_eq!(stats.snapshot().total_latency, 0);
    stats.record_decode(1_000_700);
    assert_eq!(stats.snapshot().total_latency, 0);
    stats.record_queue(1_000_800);
    assert!(stats.snapshot().total_latency > 0);
}

#[test]
fn test_next_packet_resets_total() {
    let stats = FrameStats::new();
    let meta = sender_meta(1, 100, 100, 100, 1_000_000);
    run_frame(&stats, &meta, [1_000_500, 1_000_600, 1_000_700, 1_000_800]);
    assert!(stats.snapshot().total_latency > 0);

    stats.record_ingress(&sender_meta(2, 100, 100, 100, 2_000_000), 2_000_500);
    assert_eq!(stats.snapshot().total_latency, 0);
}

#[test]
fn test_absent_extension_fields_keep_previous_values() {
    let stats = FrameStats::new();
    run_frame(
        &stats,
        &sender_meta(1, 3000, 8000, 1000, 1_000_000),
        [1_000_500, 1_000_600, 1_000_700, 1_000_800],
    );

    // Second frame carries only a frame id and a wall timestamp.
    let partial = LatencyExtension {
        frame_id: Some(2),
        rtp_pay_wall_us: Some(2_000_000),
        ..Default::default()
    };
    run_frame(&stats, &partial, [2_000_500, 2_000_600, 2_000_700, 2_000_800]);

    let snap = stats.snapshot();
    assert_eq!(snap.frame_id, 2);
    assert_eq!(snap.vid_conv, 3000);
    assert_eq!(snap.enc, 8000);
    assert_eq!(snap.udp_stream, 500);
}

#[test]
fn test_packets_per_frame_latched_at_queue() {
    let stats = FrameStats::new();
    let meta = sender_meta(1, 0, 0, 0, 1_000_000);

    stats.record_ingress(&meta, 1_000_100);
    stats.record_ingress(&meta, 1_000_200);
    stats.record_ingress(&meta, 1_000_300);
    stats.record_depay(1_000_400);
    stats.record_decode(1_000_500);
    stats.record_queue(1_000_600);

    assert_eq!(stats.snapshot().packets_per_frame, 3);

    // Counter restarts for the next frame.
    stats.record_ingress(&meta, 2_000_100);
    stats.record_depay(2_000_200);
    stats.record_decode(2_000_300);
    stats.record_queue(2_000_400);
    assert_eq!(stats.snapshot().packets_per_frame, 1);
}

#[test]
fn test_fps_from_arrival_interval() {
    let stats = FrameStats::new();

    stats.record_delivery(1_000_000);
    // First delivery has no previous interval.
    assert!(stats.snapshot().fps.abs() < f64::EPSILON);

    stats.record_delivery(1_016_667);
    let fps = stats.snapshot().fps;
    assert!((fps - 60.0).abs() < 0.1, "fps = {fps}");
}

#[test]
fn test_fps_identical_timestamps_keep_previous_value() {
    let stats = FrameStats::new();
    stats.record_delivery(1_000_000);
    stats.record_delivery(1_020_000);
    let fps_before = stats.snapshot().fps;
    assert!(fps_before > 0.0);

    stats.record_delivery(1_020_000);
    assert!((stats.snapshot().fps - fps_before).abs() < f64::EPSILON);
}

#[test]
fn test_history_ring_capped_at_fifty() {
    let stats = FrameStats::new();
    for _ in 0..(HISTORY_SIZE + 25) {
        stats.update_history();
    }
    assert_eq!(stats.history_len(), HISTORY_SIZE);
}

#[test]
fn test_averaged_snapshot_empty_ring_equals_live() {
    let stats = FrameStats::new();
    // Populate live counters without reaching the queue stage, so the
    // ring stays empty.
    stats.record_ingress(&sender_meta(9, 100, 200, 300, 1_000_000), 1_000_400);
    stats.record_depay(1_000_500);

    assert_eq!(stats.history_len(), 0);
    assert_eq!(stats.averaged_snapshot(), stats.snapshot());
}

#[test]
fn test_averaged_snapshot_means_and_latest_identity() {
    let stats = FrameStats::new();

    run_frame(
        &stats,
        &sender_meta(1, 1000, 1000, 1000, 1_000_000),
        [1_001_000, 1_002_000, 1_003_000, 1_004_000],
    );
    run_frame(
        &stats,
        &sender_meta(2, 3000, 3000, 3000, 2_000_000),
        [2_001_000, 2_003_000, 2_005_000, 2_007_000],
    );

    let avg = stats.averaged_snapshot();
    // Means of the two frames.
    assert_eq!(avg.vid_conv, 2000);
    assert_eq!(avg.enc, 2000);
    assert_eq!(avg.rtp_depay, (1000 + 2000) / 2);
    // Identity fields and stage timestamps from the latest frame.
    assert_eq!(avg.frame_id, 2);
    assert_eq!(avg.queue_ts, 2_007_000);
    assert_eq!(avg.udp_src_ts, 2_001_000);
}

#[test]
fn test_mark_presented() {
    let stats = FrameStats::new();
    stats.mark_presented(5_000_000);
    assert_eq!(stats.snapshot().presentation_ts, 5_000_000);
}

#[test]
fn test_snapshot_is_plain_copy() {
    let stats = FrameStats::new();
    let snap = stats.snapshot();
    let copy = snap;
    assert_eq!(copy, stats.snapshot());
}
