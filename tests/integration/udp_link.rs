//! The same delivery semantics over real UDP sockets on localhost.

use crate::*;
use packetlink::udp;
use packetlink_core::wire::FLAG_ACK_REQUIRED;

/// Grab two free localhost ports. Racy in principle, fine in practice.
fn two_free_ports() -> Result<(String, String)> {
    let probe_a = std::net::UdpSocket::bind("127.0.0.1:0")?;
    let probe_b = std::net::UdpSocket::bind("127.0.0.1:0")?;
    let addr_a = probe_a.local_addr()?.to_string();
    let addr_b = probe_b.local_addr()?.to_string();
    Ok((addr_a, addr_b))
}

async fn udp_pair() -> Result<(Transport, Transport)> {
    let (addr_a, addr_b) = two_free_ports()?;
    let medium_a = udp::bind(&addr_a, &addr_b, 16)
        .await
        .with_context(|| format!("failed to bind {addr_a}"))?;
    let medium_b = udp::bind(&addr_b, &addr_a, 16)
        .await
        .with_context(|| format!("failed to bind {addr_b}"))?;
    Ok((
        Transport::spawn(options("deviceA"), medium_a),
        Transport::spawn(options("deviceB"), medium_b),
    ))
}

#[tokio::test]
async fn packet_crosses_a_udp_link() -> Result<()> {
    let (node_a, node_b) = udp_pair().await?;
    let mut captured = capture(&node_b);

    node_a.send(b"over udp", "deviceB", 0).await?;

    let (payload, source) = next_packet(&mut captured).await?;
    assert_eq!(payload, b"over udp");
    assert_eq!(source, "deviceA");
    Ok(())
}

#[tokio::test]
async fn ack_round_trip_works_over_udp() -> Result<()> {
    let (node_a, node_b) = udp_pair().await?;
    let _captured = capture(&node_b);

    node_a.send(b"ping", "deviceB", FLAG_ACK_REQUIRED).await?;

    assert!(
        wait_until(|| node_a.pending_acks() == 0).await,
        "ack should make it back across the socket"
    );
    Ok(())
}
