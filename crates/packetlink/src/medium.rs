//! Medium abstraction — the transport's view of whatever moves frames.
//!
//! A medium is a pair of bounded channels carrying opaque frames. The driver
//! on the far side of the channels owns the physical details (a UDP socket,
//! an in-process loopback, a serial pump). The transport never touches the
//! medium directly, so backpressure and the send timeout live entirely in
//! the channel.

use bytes::Bytes;
use tokio::sync::mpsc;

/// Bounded frame channels between the transport and a medium driver.
///
/// `tx` carries outbound frames toward the medium; `rx` carries inbound
/// frames from it. Dropping the handle closes both directions and the
/// driver's pump tasks wind down.
pub struct MediumHandle {
    pub tx: mpsc::Sender<Bytes>,
    pub rx: mpsc::Receiver<Bytes>,
}

/// Two cross-wired medium handles: frames sent on one arrive on the other.
///
/// In-process only. Used by tests, examples, and anything that wants two
/// transports in one process without a socket.
pub fn loopback_pair(capacity: usize) -> (MediumHandle, MediumHandle) {
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);
    (
        MediumHandle { tx: a_tx, rx: a_rx },
        MediumHandle { tx: b_tx, rx: b_rx },
    )
}
