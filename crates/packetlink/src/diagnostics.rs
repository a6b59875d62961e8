//! Link diagnostics — counters for conditions that have no caller to fail.
//!
//! Everything that goes wrong in the receive path (corrupt frames, overflow,
//! packets with nobody listening) lands here instead of in an error return.
//! Counters only; inspect with `snapshot()` or log with `log_stats()`.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Diagnostics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    checksum_failures: AtomicU64,
    not_for_us: AtomicU64,
    unhandled_packets: AtomicU64,
    acks_expired: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub checksum_failures: u64,
    pub not_for_us: u64,
    pub unhandled_packets: u64,
    pub acks_expired: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Any frame discarded before delivery: decode failure, queue overflow.
    pub fn frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checksum_failure(&self) {
        self.checksum_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Unicast frame addressed to a different node. Normal on shared media.
    pub fn frame_not_for_us(&self) {
        self.not_for_us.fetch_add(1, Ordering::Relaxed);
    }

    /// Packet arrived while no handler was registered.
    pub fn packet_unhandled(&self) {
        self.unhandled_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn acks_expired_add(&self, count: u64) {
        self.acks_expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            not_for_us: self.not_for_us.load(Ordering::Relaxed),
            unhandled_packets: self.unhandled_packets.load(Ordering::Relaxed),
            acks_expired: self.acks_expired.load(Ordering::Relaxed),
        }
    }

    /// Emit one structured log line with the current counters.
    pub fn log_stats(&self) {
        let s = self.snapshot();
        tracing::info!(
            frames_sent = s.frames_sent,
            frames_received = s.frames_received,
            frames_dropped = s.frames_dropped,
            checksum_failures = s.checksum_failures,
            not_for_us = s.not_for_us,
            unhandled_packets = s.unhandled_packets,
            acks_expired = s.acks_expired,
            "link diagnostics"
        );
    }
}
