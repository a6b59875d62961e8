//! packetlink-core — wire format, text codec, and configuration.
//! The transport runtime and the demo node both depend on this one.

pub mod config;
pub mod text;
pub mod wire;

pub use wire::{Frame, WireError};
