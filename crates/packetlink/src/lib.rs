//! packetlink — point-to-point packet transport with a single receive handler.
//!
//! Outbound: caller → wire codec → bounded medium queue. Inbound: medium →
//! receive loop → dispatcher → the one registered handler. Best-effort and
//! unordered; FLAG_ACK_REQUIRED adds per-packet acknowledgement tracking,
//! nothing more.

pub mod ack;
pub mod diagnostics;
pub mod dispatch;
pub mod medium;
pub mod transport;
pub mod udp;

pub use diagnostics::DiagnosticsSnapshot;
pub use dispatch::ReceiveHandler;
pub use medium::{loopback_pair, MediumHandle};
pub use transport::{SendError, Transport, TransportOptions};
