//! Configuration system for packetlink.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $PACKETLINK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/packetlink/config.toml
//!   3. ~/.config/packetlink/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::wire::MAX_PAYLOAD;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketlinkConfig {
    pub node: NodeConfig,
    pub link: LinkConfig,
    pub reliability: ReliabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Address this node answers to. Empty = derive from the process id.
    pub local_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Largest payload accepted per frame. Capped at the wire limit of 255.
    pub mtu: usize,
    /// Outbound queue depth in frames.
    pub send_queue_depth: usize,
    /// How long send() waits for queue space before TransportBusy.
    pub send_timeout_ms: u64,
    /// UDP bind address for the demo node. Empty = must be given on the CLI.
    pub bind_addr: String,
    /// UDP peer address for the demo node.
    pub peer_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    /// Set FLAG_ACK_REQUIRED on outbound frames by default.
    pub request_acks: bool,
    /// Pending acks older than this are swept and counted as expired.
    pub ack_timeout_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for PacketlinkConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            link: LinkConfig::default(),
            reliability: ReliabilityConfig::default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            local_id: String::new(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            mtu: 200,
            send_queue_depth: 32,
            send_timeout_ms: 250,
            bind_addr: String::new(),
            peer_addr: String::new(),
        }
    }
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            request_acks: false,
            ack_timeout_ms: 1000,
        }
    }
}

impl LinkConfig {
    /// MTU with the wire-format hard cap applied.
    pub fn effective_mtu(&self) -> usize {
        self.mtu.min(MAX_PAYLOAD)
    }
}

impl NodeConfig {
    /// Configured id, or a process-derived fallback when unset.
    pub fn effective_local_id(&self) -> String {
        if self.local_id.is_empty() {
            format!("node-{:04x}", std::process::id() & 0xFFFF)
        } else {
            self.local_id.clone()
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("packetlink")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl PacketlinkConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            PacketlinkConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PACKETLINK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&PacketlinkConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply PACKETLINK_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PACKETLINK_NODE__LOCAL_ID") {
            self.node.local_id = v;
        }
        if let Ok(v) = std::env::var("PACKETLINK_LINK__MTU") {
            if let Ok(n) = v.parse() {
                self.link.mtu = n;
            }
        }
        if let Ok(v) = std::env::var("PACKETLINK_LINK__SEND_QUEUE_DEPTH") {
            if let Ok(n) = v.parse() {
                self.link.send_queue_depth = n;
            }
        }
        if let Ok(v) = std::env::var("PACKETLINK_LINK__SEND_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.link.send_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("PACKETLINK_LINK__BIND_ADDR") {
            self.link.bind_addr = v;
        }
        if let Ok(v) = std::env::var("PACKETLINK_LINK__PEER_ADDR") {
            self.link.peer_addr = v;
        }
        if let Ok(v) = std::env::var("PACKETLINK_RELIABILITY__REQUEST_ACKS") {
            self.reliability.request_acks = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("PACKETLINK_RELIABILITY__ACK_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.reliability.ack_timeout_ms = n;
            }
        }
    }
}
