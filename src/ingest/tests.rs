mod pipeline;

use crate::ingest::{Stage, StageProbe};
use crate::protocol::rtp::LatencyExtension;
use crate::stats::FrameStats;

#[test]
fn test_stats_probe_dispatches_by_stage_tag() {
    let stats = FrameStats::new();
    let meta = LatencyExtension {
        frame_id: Some(42),
        vid_conv_us: Some(3000),
        enc_us: Some(8000),
        rtp_pay_us: Some(1000),
        rtp_pay_wall_us: Some(1_000_000_000),
    };

    stats.on_pass(Stage::UdpSrc, Some(&meta), 1_000_007_000);
    stats.on_pass(Stage::RtpDepay, None, 1_000_009_000);
    stats.on_pass(Stage::Decode, None, 1_000_025_000);
    stats.on_pass(Stage::Queue, None, 1_000_026_000);

    let snap = stats.snapshot();
    assert_eq!(snap.frame_id, 42);
    assert_eq!(snap.udp_stream, 7000);
    assert_eq!(snap.rtp_depay, 2000);
    assert_eq!(snap.dec, 16_000);
    assert_eq!(snap.queue, 1000);
    assert_eq!(snap.total_latency, 38_000);
}

#[test]
fn test_stats_probe_without_metadata() {
    let stats = FrameStats::new();
    stats.on_pass(Stage::UdpSrc, None, 500);
    let snap = stats.snapshot();
    assert_eq!(snap.udp_src_ts, 500);
    assert_eq!(snap.frame_id, 0);
}
