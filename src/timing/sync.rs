//! Background NTP synchronization loop.
//!
//! Every two seconds a round fires three SNTP exchanges 20 ms apart,
//! rejects congested samples, and folds the best one into a smoothed
//! offset on the shared clock. Failures never stop the loop; a round
//! that yields no acceptable sample leaves the offset untouched.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::clock::SyncedClock;
use super::sntp::{self, NtpSample};

/// Time between sync rounds.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(2);
/// Exchanges attempted per round.
pub const SAMPLES_PER_ROUND: usize = 3;
/// Pause between exchanges within a round.
pub const SAMPLE_SPACING: Duration = Duration::from_millis(20);
/// Per-exchange receive timeout.
pub const SAMPLE_TIMEOUT: Duration = Duration::from_secs(1);
/// EWMA weight of a new sample.
pub const SMOOTHING_ALPHA: f64 = 0.10;

/// Errors from a single sync exchange or round.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Server hostname did not resolve.
    #[error("DNS resolution failed for {0}")]
    DnsResolve(String),

    /// No response within [`SAMPLE_TIMEOUT`].
    #[error("timed out waiting for NTP response")]
    RecvTimeout,

    /// Response shorter than the 48-byte SNTP packet.
    #[error("short NTP response: {0} bytes")]
    BadResponse(usize),

    /// Socket failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fold a sample into the smoothed offset.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn smooth(smoothed_us: f64, sample_offset_us: i64) -> f64 {
    SMOOTHING_ALPHA * sample_offset_us as f64 + (1.0 - SMOOTHING_ALPHA) * smoothed_us
}

/// Handle to the background sync task.
///
/// Dropping without [`NtpTimer::shutdown`] aborts the task on the next
/// await point; prefer an explicit shutdown so teardown ordering holds.
pub struct NtpTimer {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl NtpTimer {
    /// Spawn the sync loop against `server`.
    ///
    /// `server` is a hostname (port 123 implied) or a `host:port` pair.
    #[must_use]
    pub fn start(server: String, clock: Arc<SyncedClock>) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tracing::info!(server = %server, "starting NTP auto-sync");
        let handle = tokio::spawn(run_sync_loop(server, clock, shutdown_rx));
        Self { shutdown_tx, handle }
    }

    /// Stop the loop and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }
}

async fn run_sync_loop(
    server: String,
    clock: Arc<SyncedClock>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    #[allow(clippy::cast_precision_loss)]
    let mut smoothed_us = clock.offset_us() as f64;
    let mut ticker = tokio::time::interval(SYNC_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match sync_round(&server, &clock, &mut smoothed_us).await {
                    Ok(Some(offset_us)) => {
                        tracing::debug!(offset_us, "clock offset updated");
                    }
                    Ok(None) => {
                        tracing::debug!("sync round yielded no acceptable samples");
                    }
                    Err(e) => {
                        tracing::warn!("NTP sync round failed: {e}");
                    }
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}

/// Run one sync round; returns the new offset if one was installed.
///
/// # Errors
/// Returns `SyncError` only for round-level failures (resolution, local
/// socket). Per-sample failures are logged and absorbed.
pub async fn sync_round(
    server: &str,
    clock: &SyncedClock,
    smoothed_us: &mut f64,
) -> Result<Option<i64>, SyncError> {
    let server_addr = resolve(server).await?;
    let socket = UdpSocket::bind("0.0.0.0:0").await?;

    let mut samples = Vec::with_capacity(SAMPLES_PER_ROUND);
    for i in 0..SAMPLES_PER_ROUND {
        if i > 0 {
            tokio::time::sleep(SAMPLE_SPACING).await;
        }
        match fetch_sample(&socket, server_addr, clock).await {
            Ok(sample) if sample.is_acceptable() => samples.push(sample),
            Ok(sample) => {
                tracing::debug!(rtt_us = sample.rtt_us, "discarding high-rtt NTP sample");
            }
            Err(e) => tracing::debug!("NTP sample failed: {e}"),
        }
    }

    let Some(best) = sntp::best_sample(&samples) else {
        return Ok(None);
    };

    *smoothed_us = smooth(*smoothed_us, best.offset_us);
    #[allow(clippy::cast_possible_truncation)]
    let offset_us = *smoothed_us as i64;
    clock.set_offset(offset_us);
    Ok(Some(offset_us))
}

async fn fetch_sample(
    socket: &UdpSocket,
    server_addr: SocketAddr,
    clock: &SyncedClock,
) -> Result<NtpSample, SyncError> {
    let request = sntp::client_request();

    let send_local = clock.now_raw_us();
    socket.send_to(&request, server_addr).await?;

    let mut buf = [0u8; 128];
    let (len, _) = tokio::time::timeout(SAMPLE_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .map_err(|_| SyncError::RecvTimeout)??;
    let recv_local = clock.now_raw_us();

    let rtt_us = recv_local.saturating_sub(send_local);
    let server_us = sntp::transmit_time_us(&buf[..len])?;

    // Latency-compensated server time; half the round trip is assumed
    // to sit on the return path.
    let server_adj_us = server_us + rtt_us / 2;

    #[allow(clippy::cast_possible_wrap)]
    let offset_us = recv_local as i64 - server_adj_us as i64;

    tracing::trace!(offset_us, rtt_us, "NTP sample");
    Ok(NtpSample { offset_us, rtt_us })
}

async fn resolve(server: &str) -> Result<SocketAddr, SyncError> {
    let target = if server.contains(':') {
        server.to_string()
    } else {
        format!("{server}:{}", sntp::NTP_PORT)
    };
    let lookup = tokio::net::lookup_host(target).await;
    lookup
        .map_err(|_| SyncError::DnsResolve(server.to_string()))?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| SyncError::DnsResolve(server.to_string()))
}
