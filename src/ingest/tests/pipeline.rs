use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::ingest::jitter::JitterConfig;
use crate::ingest::pipeline::{IngestConfig, IngestState, RtpIngest};
use crate::ingest::{Stage, StageProbe};
use crate::protocol::rtp::LatencyExtension;
use crate::stats::FrameStats;
use crate::testing;
use crate::timing::SyncedClock;
use crate::types::config::{CameraResolution, Codec};
use crate::video::decoder::{DecodeError, RawRgbDecoder, VideoDecoder};
use crate::video::frame::{Eye, FramePair};

fn small_res() -> CameraResolution {
    CameraResolution::from_label("nHD").unwrap()
}

fn ingest_config() -> IngestConfig {
    IngestConfig {
        eye: Eye::Left,
        port: 0,
        codec: Codec::Jpeg,
        resolution: small_res(),
        jitter: JitterConfig::default(),
    }
}

async fn configured_ingest(
    stats: Arc<FrameStats>,
    pair: Arc<FramePair>,
) -> RtpIngest {
    RtpIngest::configure(
        ingest_config(),
        Arc::new(SyncedClock::new()),
        stats,
        pair,
        Box::new(RawRgbDecoder::new(&small_res())),
        mpsc::channel(64).0,
    )
    .await
    .expect("configure failed")
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2 s");
}

#[tokio::test]
async fn test_state_machine_lifecycle() {
    let pair = Arc::new(FramePair::new(&small_res()));
    let mut ingest = configured_ingest(Arc::new(FrameStats::new()), pair).await;

    assert_eq!(ingest.state(), IngestState::Ready);
    assert!(ingest.local_port().is_some());

    ingest.play().unwrap();
    assert_eq!(ingest.state(), IngestState::Playing);

    // Playing twice is a state error.
    assert!(ingest.play().is_err());

    ingest.teardown().await;
}

#[tokio::test]
async fn test_single_frame_end_to_end() {
    let stats = Arc::new(FrameStats::new());
    let pair = Arc::new(FramePair::new(&small_res()));
    let mut ingest = configured_ingest(stats.clone(), pair.clone()).await;
    let port = ingest.local_port().unwrap();
    ingest.play().unwrap();

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let datagram = testing::single_packet_frame(26, 1, 42, &[0xAB; 64], 0);
    sender.send_to(&datagram, ("127.0.0.1", port)).await.unwrap();

    wait_until(|| stats.history_len() == 1).await;

    let snap = stats.snapshot();
    assert_eq!(snap.frame_id, 42);
    assert_eq!(snap.vid_conv, 3000);
    assert_eq!(snap.packets_per_frame, 1);
    assert!(snap.total_latency > 0);

    pair.left().with_data(|data| {
        assert_eq!(&data[..64], &[0xAB; 64]);
        assert!(data[64..].iter().all(|&b| b == 0));
    });

    ingest.teardown().await;
}

#[tokio::test]
async fn test_multi_packet_frame_assembled_on_marker() {
    let stats = Arc::new(FrameStats::new());
    let pair = Arc::new(FramePair::new(&small_res()));
    let mut ingest = configured_ingest(stats.clone(), pair.clone()).await;
    let port = ingest.local_port().unwrap();
    ingest.play().unwrap();

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = ("127.0.0.1", port);

    let meta = LatencyExtension { frame_id: Some(7), ..Default::default() };
    sender
        .send_to(&testing::rtp_datagram(26, 0, 9000, false, &[1; 16], Some(&meta)), target)
        .await
        .unwrap();
    sender
        .send_to(&testing::rtp_datagram(26, 1, 9000, false, &[2; 16], None), target)
        .await
        .unwrap();
    sender
        .send_to(&testing::rtp_datagram(26, 2, 9000, true, &[3; 16], None), target)
        .await
        .unwrap();

    wait_until(|| stats.history_len() == 1).await;

    let snap = stats.snapshot();
    assert_eq!(snap.frame_id, 7);
    assert_eq!(snap.packets_per_frame, 3);

    pair.left().with_data(|data| {
        assert_eq!(&data[..16], &[1; 16]);
        assert_eq!(&data[16..32], &[2; 16]);
        assert_eq!(&data[32..48], &[3; 16]);
    });

    ingest.teardown().await;
}

#[tokio::test]
async fn test_malformed_and_foreign_packets_ignored() {
    let stats = Arc::new(FrameStats::new());
    let pair = Arc::new(FramePair::new(&small_res()));
    let mut ingest = configured_ingest(stats.clone(), pair.clone()).await;
    let port = ingest.local_port().unwrap();
    ingest.play().unwrap();

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = ("127.0.0.1", port);

    // Garbage, then a wrong payload type, then a healthy frame.
    sender.send_to(&[0xFF, 0x00, 0x01], target).await.unwrap();
    sender
        .send_to(&testing::rtp_datagram(96, 0, 0, true, &[9; 8], None), target)
        .await
        .unwrap();
    sender
        .send_to(&testing::single_packet_frame(26, 1, 11, &[4; 8], 0), target)
        .await
        .unwrap();

    wait_until(|| stats.history_len() == 1).await;
    assert_eq!(stats.snapshot().frame_id, 11);

    ingest.teardown().await;
}

#[derive(Default)]
struct RecordingProbe {
    stages: Mutex<Vec<Stage>>,
}

impl StageProbe for RecordingProbe {
    fn on_pass(&self, stage: Stage, _meta: Option<&LatencyExtension>, _now_us: u64) {
        self.stages.lock().unwrap().push(stage);
    }
}

#[tokio::test]
async fn test_probe_points_fire_in_stage_order() {
    let probe = Arc::new(RecordingProbe::default());
    let pair = Arc::new(FramePair::new(&small_res()));
    let mut ingest = configured_ingest(Arc::new(FrameStats::new()), pair).await;
    ingest.set_probe(probe.clone()).unwrap();
    let port = ingest.local_port().unwrap();
    ingest.play().unwrap();

    // Probe swaps are only legal before play.
    assert!(ingest.set_probe(probe.clone()).is_err());

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender
        .send_to(
            &testing::single_packet_frame(26, 1, 1, &[1; 8], 0),
            ("127.0.0.1", port),
        )
        .await
        .unwrap();

    wait_until(|| probe.stages.lock().unwrap().len() == 4).await;
    assert_eq!(
        *probe.stages.lock().unwrap(),
        vec![Stage::UdpSrc, Stage::RtpDepay, Stage::Decode, Stage::Queue]
    );

    ingest.teardown().await;
}

struct FaultingDecoder;

impl VideoDecoder for FaultingDecoder {
    fn decode(&mut self, _access_unit: &[u8]) -> Result<Vec<u8>, DecodeError> {
        Err(DecodeError::Malformed("synthetic fault".to_string()))
    }
}

#[tokio::test]
async fn test_decoder_fault_tears_down_to_null() {
    let (events_tx, mut events_rx) = mpsc::channel(64);
    let pair = Arc::new(FramePair::new(&small_res()));
    let mut ingest = RtpIngest::configure(
        ingest_config(),
        Arc::new(SyncedClock::new()),
        Arc::new(FrameStats::new()),
        pair,
        Box::new(FaultingDecoder),
        events_tx,
    )
    .await
    .unwrap();
    let port = ingest.local_port().unwrap();
    ingest.play().unwrap();

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender
        .send_to(
            &testing::single_packet_frame(26, 1, 1, &[1; 8], 0),
            ("127.0.0.1", port),
        )
        .await
        .unwrap();

    wait_until(|| ingest.state() == IngestState::Null).await;

    // The fault was reported on the event channel.
    let mut saw_error = false;
    while let Ok(event) = events_rx.try_recv() {
        if matches!(event, crate::ingest::PipelineEvent::Error { .. }) {
            saw_error = true;
        }
    }
    assert!(saw_error);

    ingest.teardown().await;
}
