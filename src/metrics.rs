//! Process-wide gateway counters.
//! Cheap atomics bumped from the driver and the report pipeline; `snapshot()` is what the
//! shutdown log and the `status` command print.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

static FRAMES_DECODED: AtomicU64 = AtomicU64::new(0);
static FRAMES_REJECTED: AtomicU64 = AtomicU64::new(0);
static PUBLISH_OK: AtomicU64 = AtomicU64::new(0);
static PUBLISH_FAILED: AtomicU64 = AtomicU64::new(0);
static ACKS_SENT: AtomicU64 = AtomicU64::new(0);
static ACKS_FAILED: AtomicU64 = AtomicU64::new(0);
static TRANSACTION_TIMEOUTS: AtomicU64 = AtomicU64::new(0);

pub fn inc_frames_decoded() {
    FRAMES_DECODED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_frames_rejected() {
    FRAMES_REJECTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_publish_ok() {
    PUBLISH_OK.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_publish_failed() {
    PUBLISH_FAILED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_acks_sent() {
    ACKS_SENT.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_acks_failed() {
    ACKS_FAILED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_transaction_timeouts() {
    TRANSACTION_TIMEOUTS.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub frames_decoded: u64,
    pub frames_rejected: u64,
    pub publish_ok: u64,
    pub publish_failed: u64,
    pub acks_sent: u64,
    pub acks_failed: u64,
    pub transaction_timeouts: u64,
}

impl Snapshot {
    /// Fraction of decoded frames whose acknowledgment the module accepted.
    pub fn ack_ratio(&self) -> Option<f64> {
        let attempts = self.acks_sent + self.acks_failed;
        if attempts == 0 {
            None
        } else {
            Some(self.acks_sent as f64 / attempts as f64)
        }
    }
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        frames_decoded: FRAMES_DECODED.load(Ordering::Relaxed),
        frames_rejected: FRAMES_REJECTED.load(Ordering::Relaxed),
        publish_ok: PUBLISH_OK.load(Ordering::Relaxed),
        publish_failed: PUBLISH_FAILED.load(Ordering::Relaxed),
        acks_sent: ACKS_SENT.load(Ordering::Relaxed),
        acks_failed: ACKS_FAILED.load(Ordering::Relaxed),
        transaction_timeouts: TRANSACTION_TIMEOUTS.load(Ordering::Relaxed),
    }
}
