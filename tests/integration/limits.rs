//! Send-side validation and backpressure.

use crate::*;
use packetlink::SendError;
use packetlink_core::wire;

#[tokio::test]
async fn the_medium_observes_exactly_one_matching_frame() -> Result<()> {
    let (transport, _inject, mut observed) = probed("deviceA");

    transport.send(&[0x01, 0x02, 0x03], "deviceA-peer", 0).await?;

    let raw = tokio::time::timeout(TEST_TIMEOUT, observed.recv())
        .await
        .context("no frame reached the medium")?
        .context("medium channel closed")?;
    let frame = wire::decode_frame(&raw)?;
    assert_eq!(frame.destination, "deviceA-peer");
    assert_eq!(&frame.payload[..], &[0x01, 0x02, 0x03]);
    assert_eq!(frame.flags, 0, "default flags are zero");
    assert!(observed.try_recv().is_err(), "exactly one frame");
    Ok(())
}

#[tokio::test]
async fn payload_above_mtu_is_rejected_before_the_medium() {
    let (transport, _inject, mut observed) = probed("deviceA");

    let payload = vec![0xAA; transport.mtu() + 1];
    let err = transport.send(&payload, "deviceB", 0).await.unwrap_err();
    assert!(matches!(err, SendError::PayloadTooLarge { .. }));
    assert!(observed.try_recv().is_err(), "nothing may be transmitted");
}

#[tokio::test]
async fn payload_at_exactly_mtu_is_accepted() -> Result<()> {
    let (node_a, node_b) = linked_pair("deviceA", "deviceB");
    let mut captured = capture(&node_b);

    let payload = vec![0x42; node_a.mtu()];
    node_a.send(&payload, "deviceB", 0).await?;

    let (got, _) = next_packet(&mut captured).await?;
    assert_eq!(got, payload);
    Ok(())
}

#[tokio::test]
async fn empty_destination_without_broadcast_is_invalid() {
    let (transport, _inject, _observed) = probed("deviceA");
    let err = transport.send(b"x", "", 0).await.unwrap_err();
    assert!(matches!(err, SendError::InvalidDestination(_)));
}

#[tokio::test]
async fn oversized_destination_is_invalid() {
    let (transport, _inject, _observed) = probed("deviceA");
    let destination = "d".repeat(wire::MAX_ADDR + 1);
    let err = transport.send(b"x", &destination, 0).await.unwrap_err();
    assert!(matches!(err, SendError::InvalidDestination(_)));
}

#[tokio::test]
async fn stalled_link_reports_busy_then_recovers() -> Result<()> {
    let (medium_a, mut medium_b) = packetlink::loopback_pair(1);
    let transport = Transport::spawn(options("deviceA"), medium_a);

    transport.send(b"first", "deviceB", 0).await?;
    let err = transport.send(b"second", "deviceB", 0).await.unwrap_err();
    assert_eq!(err, SendError::TransportBusy);

    medium_b.rx.recv().await.context("stalled frame lost")?;
    transport.send(b"third", "deviceB", 0).await?;
    Ok(())
}
