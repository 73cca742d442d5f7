//! Air-quality monitor state-sync daemon.
//!
//! Keeps the authoritative sensor state of a single device in sync over MQTT:
//! inbound readings are validated, persisted, mirrored to the tri-color
//! indicator LED, and republished retained for every other subscriber
//! (web bridge, on-device UI, command-line tooling).

pub mod config;
pub mod identity;
pub mod indicator;
pub mod state;
pub mod sync;
pub mod topics;
