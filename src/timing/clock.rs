//! Corrected microsecond clock.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Microsecond clock corrected by an externally maintained NTP offset.
///
/// Readers are lock-free: the offset is a single atomic word, so a
/// consumer observes either the old or the new offset, never a torn one.
/// Until the first successful sync the offset is zero and corrected time
/// equals raw time.
#[derive(Debug, Default)]
pub struct SyncedClock {
    /// Signed offset `local - server`, microseconds.
    offset_us: AtomicI64,
    /// Raw local time of the last successful sync, 0 = never.
    last_sync_raw_us: AtomicU64,
}

impl SyncedClock {
    /// Create a clock with zero offset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw local wall-clock microseconds since the UNIX epoch.
    #[must_use]
    pub fn now_raw_us(&self) -> u64 {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        elapsed.as_secs() * 1_000_000 + u64::from(elapsed.subsec_micros())
    }

    /// Corrected microseconds: raw time minus the current offset.
    ///
    /// This is the timeline shared with the robot; every frame and
    /// datagram timestamp in the crate comes from here.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn now_corrected_us(&self) -> u64 {
        let raw = self.now_raw_us();
        let offset = self.offset_us.load(Ordering::Acquire);
        (raw as i64 - offset).max(0) as u64
    }

    /// Current offset in microseconds.
    #[must_use]
    pub fn offset_us(&self) -> i64 {
        self.offset_us.load(Ordering::Acquire)
    }

    /// Install a new offset. Only the sync loop calls this.
    pub fn set_offset(&self, offset_us: i64) {
        self.offset_us.store(offset_us, Ordering::Release);
        self.last_sync_raw_us
            .store(self.now_raw_us(), Ordering::Release);
    }

    /// Raw local time of the last successful sync, if any.
    #[must_use]
    pub fn last_sync_raw_us(&self) -> Option<u64> {
        match self.last_sync_raw_us.load(Ordering::Acquire) {
            0 => None,
            us => Some(us),
        }
    }
}
