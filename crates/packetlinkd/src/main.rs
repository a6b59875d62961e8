//! packetlinkd — interactive packetlink node over a UDP link.
//!
//! Usage: packetlinkd [bind_addr] [peer_addr] [destination_id]
//!
//! Arguments fall back to [link] config values. An empty destination id
//! broadcasts. Received packets are printed as text; stdin lines are sent.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use packetlink::{udp, Transport, TransportOptions};
use packetlink_core::config::PacketlinkConfig;
use packetlink_core::text::decode_as_text;
use packetlink_core::wire::{FLAG_ACK_REQUIRED, FLAG_BROADCAST};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = PacketlinkConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = PacketlinkConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        PacketlinkConfig::default()
    });

    let mut args = std::env::args().skip(1);
    let bind_addr = args.next().unwrap_or_else(|| config.link.bind_addr.clone());
    let peer_addr = args.next().unwrap_or_else(|| config.link.peer_addr.clone());
    let destination = args.next().unwrap_or_default();
    if bind_addr.is_empty() || peer_addr.is_empty() {
        bail!("usage: packetlinkd <bind_addr> <peer_addr> [destination_id] (or set [link] in the config)");
    }

    let medium = udp::bind(&bind_addr, &peer_addr, config.link.send_queue_depth)
        .await
        .with_context(|| format!("failed to bind udp medium on {bind_addr}"))?;
    let transport = Transport::spawn(TransportOptions::from_config(&config), medium);
    tracing::info!(
        local_id = transport.local_id(),
        mtu = transport.mtu(),
        bind = %bind_addr,
        peer = %peer_addr,
        "packetlinkd up"
    );

    transport.on_receive(|payload, source| {
        println!("[{source}] {}", decode_as_text(payload));
    });

    let mut flags = 0u8;
    if config.reliability.request_acks {
        flags |= FLAG_ACK_REQUIRED;
    }
    if destination.is_empty() {
        flags |= FLAG_BROADCAST;
        tracing::info!("no destination id given, sending as broadcast");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        match transport.send(line.as_bytes(), &destination, flags).await {
            Ok(packet_id) => tracing::debug!(packet_id, "packet sent"),
            Err(e) => tracing::warn!(error = %e, "send failed"),
        }
    }

    transport.log_diagnostics();
    Ok(())
}
