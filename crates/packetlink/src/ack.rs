//! Pending-ack tracking — records which packet ids still await an ack.
//!
//! Tracking only: no retransmission, no ordering. An entry is cleared by a
//! matching FLAG_IS_ACK frame or swept once it outlives the ack timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Packet ids sent with FLAG_ACK_REQUIRED that have not been acknowledged.
#[derive(Clone)]
pub struct PendingAcks {
    inner: Arc<DashMap<u16, Instant>>,
}

impl PendingAcks {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Record a freshly sent ack-required packet.
    pub fn record(&self, packet_id: u16) {
        self.inner.insert(packet_id, Instant::now());
    }

    /// Clear the entry for an arrived ack. Returns false if the id was not
    /// pending (duplicate or stray ack).
    pub fn acknowledge(&self, packet_id: u16) -> bool {
        self.inner.remove(&packet_id).is_some()
    }

    /// Drop entries older than `timeout`. Returns how many were swept.
    pub fn sweep_expired(&self, timeout: Duration) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, sent_at| sent_at.elapsed() <= timeout);
        before.saturating_sub(self.inner.len())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for PendingAcks {
    fn default() -> Self {
        Self::new()
    }
}
