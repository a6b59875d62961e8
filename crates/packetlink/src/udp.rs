//! UDP medium — one datagram per frame over a connected socket.
//!
//! Two pump tasks bridge the socket and the medium channels. The receive
//! pump never blocks on the transport: if the inbound queue is full the
//! datagram is dropped and logged, which is the correct behaviour for a
//! best-effort link.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::medium::MediumHandle;

/// Largest datagram the receive pump accepts. Comfortably above the
/// maximum frame size (4 + 2*256 + 256 + 1 bytes).
const RECV_BUF: usize = 2048;

/// Bind a local UDP socket, connect it to the remote, and return the
/// medium handle for a transport. `queue_depth` bounds both directions.
pub async fn bind(local: &str, remote: &str, queue_depth: usize) -> io::Result<MediumHandle> {
    let socket = Arc::new(UdpSocket::bind(local).await?);
    socket.connect(remote).await?;
    tracing::info!(
        local = %socket.local_addr()?,
        remote,
        "udp medium up"
    );

    let (out_tx, mut out_rx) = mpsc::channel::<Bytes>(queue_depth);
    let (in_tx, in_rx) = mpsc::channel::<Bytes>(queue_depth);

    let send_socket = socket.clone();
    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = send_socket.send(&frame).await {
                tracing::warn!(error = %e, "udp send failed, frame dropped");
            }
        }
        tracing::debug!("outbound pump ending, medium handle dropped");
    });

    tokio::spawn(async move {
        let mut buf = [0u8; RECV_BUF];
        loop {
            match socket.recv(&mut buf).await {
                Ok(n) => {
                    if in_tx.try_send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                        if in_tx.is_closed() {
                            break;
                        }
                        tracing::warn!(len = n, "inbound queue full, datagram dropped");
                    }
                }
                Err(e) => {
                    if in_tx.is_closed() {
                        break;
                    }
                    // Connected UDP surfaces ICMP errors here; the link
                    // itself is still usable.
                    tracing::warn!(error = %e, "udp recv failed");
                }
            }
        }
        tracing::debug!("inbound pump ending");
    });

    Ok(MediumHandle { tx: out_tx, rx: in_rx })
}
