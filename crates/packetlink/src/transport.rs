//! Transport — owns the medium, the outbound queue, and the receive loop.
//!
//! `send` validates, encodes, and enqueues; it returns once the frame is
//! accepted by the outbound queue, not once it is delivered. Inbound frames
//! are decoded on a dedicated receive task which handles acks and hands the
//! packet to the dispatcher. Ack replies go through the outbound queue like
//! any other frame — the receive task never writes to the medium inline.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use packetlink_core::config::PacketlinkConfig;
use packetlink_core::wire::{self, WireError, FLAG_ACK_REQUIRED, FLAG_BROADCAST, FLAG_MASK};

use crate::ack::PendingAcks;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot};
use crate::dispatch::{Dispatcher, ReceiveHandler};
use crate::medium::MediumHandle;

// ── Options ───────────────────────────────────────────────────────────────────

/// Knobs for one transport instance.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Address this node answers to. Also the source on outbound frames.
    pub local_id: String,
    /// Largest accepted payload. Capped at the wire limit of 255.
    pub mtu: usize,
    /// How long `send` waits for outbound queue space.
    pub send_timeout: Duration,
    /// Pending acks older than this are swept and counted as expired.
    pub ack_timeout: Duration,
}

impl TransportOptions {
    pub fn from_config(config: &PacketlinkConfig) -> Self {
        Self {
            local_id: config.node.effective_local_id(),
            mtu: config.link.effective_mtu(),
            send_timeout: Duration::from_millis(config.link.send_timeout_ms),
            ack_timeout: Duration::from_millis(config.reliability.ack_timeout_ms),
        }
    }
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::from_config(&PacketlinkConfig::default())
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Synchronous failures of `send`. Receive-path conditions never surface
/// here; they are visible only through diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("payload of {len} bytes exceeds the {mtu}-byte MTU")]
    PayloadTooLarge { len: usize, mtu: usize },

    #[error("invalid destination: {0}")]
    InvalidDestination(&'static str),

    #[error("outbound queue did not drain within the send timeout")]
    TransportBusy,

    #[error("medium is closed")]
    LinkDown,
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// Handle to a running transport. Cheap to clone; all clones share the
/// same link, handler slot, and counters.
#[derive(Clone)]
pub struct Transport {
    local_id: Arc<str>,
    mtu: usize,
    send_timeout: Duration,
    ack_timeout: Duration,
    outbound: mpsc::Sender<Bytes>,
    dispatcher: Arc<Dispatcher>,
    pending: PendingAcks,
    diagnostics: Arc<Diagnostics>,
}

impl Transport {
    /// Attach a transport to a medium and start its receive loop.
    ///
    /// The local id is clamped to the wire's address limit here so that
    /// `send` can never fail on the source field.
    pub fn spawn(options: TransportOptions, medium: MediumHandle) -> Transport {
        let MediumHandle { tx, rx } = medium;
        let mut local_id = options.local_id;
        if local_id.len() > wire::MAX_ADDR {
            let mut cut = wire::MAX_ADDR;
            while !local_id.is_char_boundary(cut) {
                cut -= 1;
            }
            tracing::warn!(
                len = local_id.len(),
                max = wire::MAX_ADDR,
                "local id exceeds the wire address limit, truncating"
            );
            local_id.truncate(cut);
        }
        let transport = Transport {
            local_id: local_id.into(),
            mtu: options.mtu.min(wire::MAX_PAYLOAD),
            send_timeout: options.send_timeout,
            ack_timeout: options.ack_timeout,
            outbound: tx,
            dispatcher: Arc::new(Dispatcher::new()),
            pending: PendingAcks::new(),
            diagnostics: Arc::new(Diagnostics::new()),
        };

        tokio::spawn(run_receive_loop(rx, transport.clone()));
        transport
    }

    /// Send one packet. Returns the assigned packet id once the frame is
    /// accepted by the outbound queue.
    pub async fn send(
        &self,
        payload: &[u8],
        destination: &str,
        flags: u8,
    ) -> Result<u16, SendError> {
        if payload.len() > self.mtu {
            return Err(SendError::PayloadTooLarge {
                len: payload.len(),
                mtu: self.mtu,
            });
        }
        if destination.is_empty() && flags & FLAG_BROADCAST == 0 {
            return Err(SendError::InvalidDestination(
                "empty destination without the broadcast flag",
            ));
        }
        if destination.len() > wire::MAX_ADDR {
            return Err(SendError::InvalidDestination(
                "destination exceeds one length byte",
            ));
        }

        // Reserved bits are cleared rather than rejected; the wire format
        // owns their meaning, not the caller.
        let flags = flags & FLAG_MASK;
        let packet_id = next_packet_id();
        let frame = wire::encode_frame(packet_id, &self.local_id, destination, payload, flags)
            .map_err(|_| SendError::InvalidDestination("frame encoding failed"))?;

        match self.outbound.send_timeout(frame, self.send_timeout).await {
            Ok(()) => {
                self.diagnostics.frame_sent();
                if flags & FLAG_ACK_REQUIRED != 0 {
                    self.pending.record(packet_id);
                }
                Ok(packet_id)
            }
            Err(SendTimeoutError::Timeout(_)) => Err(SendError::TransportBusy),
            Err(SendTimeoutError::Closed(_)) => Err(SendError::LinkDown),
        }
    }

    /// Register the receive handler, replacing any previous one.
    pub fn on_receive<F>(&self, handler: F)
    where
        F: Fn(&[u8], &str) + Send + Sync + 'static,
    {
        self.dispatcher.set(Arc::new(handler));
    }

    /// Register an already-shared handler.
    pub fn set_receive_handler(&self, handler: ReceiveHandler) {
        self.dispatcher.set(handler);
    }

    /// Clear the handler slot. Inbound packets are dropped (and counted)
    /// until a new handler is registered.
    pub fn clear_receive_handler(&self) {
        self.dispatcher.clear();
    }

    /// Sent-but-unacknowledged ack-required packets, after sweeping
    /// entries that outlived the ack timeout.
    pub fn pending_acks(&self) -> usize {
        let expired = self.pending.sweep_expired(self.ack_timeout);
        if expired > 0 {
            self.diagnostics.acks_expired_add(expired as u64);
        }
        self.pending.len()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Emit the diagnostics counters as one structured log line.
    pub fn log_diagnostics(&self) {
        self.diagnostics.log_stats();
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }
}

/// Fresh nonzero packet id. Random rather than sequential so two nodes
/// restarting with the same id stream do not confuse each other's acks.
fn next_packet_id() -> u16 {
    rand::thread_rng().gen_range(1..=u16::MAX)
}

// ── Receive loop ──────────────────────────────────────────────────────────────

async fn run_receive_loop(mut rx: mpsc::Receiver<Bytes>, transport: Transport) {
    while let Some(raw) = rx.recv().await {
        let expired = transport.pending.sweep_expired(transport.ack_timeout);
        if expired > 0 {
            transport.diagnostics.acks_expired_add(expired as u64);
            tracing::debug!(expired, "pending acks expired unanswered");
        }

        let frame = match wire::decode_frame(&raw) {
            Ok(frame) => frame,
            Err(WireError::ChecksumMismatch) => {
                transport.diagnostics.checksum_failure();
                transport.diagnostics.frame_dropped();
                tracing::warn!(len = raw.len(), "checksum mismatch, frame dropped");
                continue;
            }
            Err(e) => {
                transport.diagnostics.frame_dropped();
                tracing::warn!(error = %e, len = raw.len(), "malformed frame dropped");
                continue;
            }
        };
        transport.diagnostics.frame_received();

        if frame.is_ack() {
            if !transport.pending.acknowledge(frame.packet_id) {
                tracing::debug!(packet_id = frame.packet_id, "ack for unknown packet id");
            }
            continue;
        }

        if !frame.is_broadcast() && frame.destination != *transport.local_id {
            transport.diagnostics.frame_not_for_us();
            continue;
        }

        if frame.wants_ack() {
            send_ack(&transport, frame.packet_id, &frame.source);
        }

        if !transport.dispatcher.deliver(&frame.payload, &frame.source) {
            transport.diagnostics.packet_unhandled();
        }
    }
    tracing::debug!("medium closed, receive loop ending");
}

/// Enqueue an ack reply. try_send, never a blocking write: the receive
/// loop must not stall on its own outbound traffic.
fn send_ack(transport: &Transport, packet_id: u16, source: &str) {
    match wire::encode_frame(packet_id, &transport.local_id, source, &[], wire::FLAG_IS_ACK) {
        Ok(ack) => {
            if transport.outbound.try_send(ack).is_err() {
                transport.diagnostics.frame_dropped();
                tracing::warn!(packet_id, "outbound queue full, ack dropped");
            } else {
                transport.diagnostics.frame_sent();
            }
        }
        Err(e) => {
            tracing::warn!(packet_id, error = %e, "could not encode ack");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
