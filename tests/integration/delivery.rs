//! End-to-end delivery over the loopback link.

use crate::*;
use packetlink_core::text::decode_as_text;
use packetlink_core::wire::FLAG_BROADCAST;

#[tokio::test]
async fn packet_crosses_the_link_with_payload_and_source() -> Result<()> {
    let (node_a, node_b) = linked_pair("deviceA", "deviceB");
    let mut captured = capture(&node_b);

    node_a.send(&[0x68, 0x69], "deviceB", 0).await?;

    let (payload, source) = next_packet(&mut captured).await?;
    assert_eq!(payload, vec![0x68, 0x69]);
    assert_eq!(source, "deviceA");
    Ok(())
}

#[tokio::test]
async fn replacing_the_handler_routes_to_the_new_one_only() -> Result<()> {
    let (node_a, node_b) = linked_pair("deviceA", "deviceB");

    // H1, then H2. H1's channel stays open so anything it received
    // would still be visible.
    let (h1_tx, mut h1_rx) = tokio::sync::mpsc::channel::<Vec<u8>>(8);
    node_b.on_receive(move |payload, _| {
        let _ = h1_tx.try_send(payload.to_vec());
    });
    let (h2_tx, mut h2_rx) = tokio::sync::mpsc::channel::<Vec<u8>>(8);
    node_b.on_receive(move |payload, _| {
        let _ = h2_tx.try_send(payload.to_vec());
    });

    node_a.send(b"after-replace", "deviceB", 0).await?;

    let got = tokio::time::timeout(TEST_TIMEOUT, h2_rx.recv())
        .await
        .context("H2 should receive")?
        .context("H2 channel closed")?;
    assert_eq!(got, b"after-replace");
    assert!(h1_rx.try_recv().is_err(), "H1 must never be invoked");
    Ok(())
}

#[tokio::test]
async fn cleared_handler_drops_packets_without_crashing() -> Result<()> {
    let (node_a, node_b) = linked_pair("deviceA", "deviceB");
    let _captured = capture(&node_b);
    node_b.clear_receive_handler();

    node_a.send(b"into the void", "deviceB", 0).await?;

    assert!(
        wait_until(|| node_b.diagnostics().unhandled_packets == 1).await,
        "packet should be counted as unhandled"
    );
    // The link still works once a handler returns.
    let mut captured = capture(&node_b);
    node_a.send(b"hello again", "deviceB", 0).await?;
    let (payload, _) = next_packet(&mut captured).await?;
    assert_eq!(payload, b"hello again");
    Ok(())
}

#[tokio::test]
async fn broadcast_reaches_a_node_with_a_different_id() -> Result<()> {
    let (node_a, node_b) = linked_pair("deviceA", "deviceB");
    let mut captured = capture(&node_b);

    node_a.send(b"all hands", "", FLAG_BROADCAST).await?;

    let (payload, source) = next_packet(&mut captured).await?;
    assert_eq!(payload, b"all hands");
    assert_eq!(source, "deviceA");
    Ok(())
}

#[tokio::test]
async fn unicast_for_another_id_is_not_delivered() -> Result<()> {
    let (node_a, node_b) = linked_pair("deviceA", "deviceB");
    let mut captured = capture(&node_b);

    node_a.send(b"not yours", "deviceC", 0).await?;
    node_a.send(b"yours", "deviceB", 0).await?;

    let (payload, _) = next_packet(&mut captured).await?;
    assert_eq!(payload, b"yours");
    assert_eq!(node_b.diagnostics().not_for_us, 1);
    Ok(())
}

#[tokio::test]
async fn text_payload_survives_the_link_as_text() -> Result<()> {
    let (node_a, node_b) = linked_pair("deviceA", "deviceB");
    let mut captured = capture(&node_b);

    let message = "héllo, deviceB ✓";
    node_a.send(message.as_bytes(), "deviceB", 0).await?;

    let (payload, _) = next_packet(&mut captured).await?;
    assert_eq!(decode_as_text(&payload), message);
    Ok(())
}

#[tokio::test]
async fn both_directions_work_on_one_link() -> Result<()> {
    let (node_a, node_b) = linked_pair("deviceA", "deviceB");
    let mut captured_a = capture(&node_a);
    let mut captured_b = capture(&node_b);

    node_a.send(b"ping", "deviceB", 0).await?;
    let (payload, source) = next_packet(&mut captured_b).await?;
    assert_eq!(payload, b"ping");
    assert_eq!(source, "deviceA");

    node_b.send(b"pong", "deviceA", 0).await?;
    let (payload, source) = next_packet(&mut captured_a).await?;
    assert_eq!(payload, b"pong");
    assert_eq!(source, "deviceB");
    Ok(())
}
