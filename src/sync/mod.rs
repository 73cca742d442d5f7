//! # Bus Synchronization Module
//!
//! Owns the MQTT session of the daemon and the request cycle that keeps the
//! persisted sensor state, the indicator LED and every bus subscriber in
//! agreement.
//!
//! ## Module Architecture
//!
//! ```text
//! sync/
//! ├── connection.rs - session lifecycle state machine and dispatch loop
//! ├── daemon.rs     - per-message orchestration and topic routing
//! └── error.rs      - error definitions
//! ```
//!
//! ## Concurrency Model
//!
//! Everything here runs on one thread. The connect-retry loop blocks it
//! with real-time sleeps before dispatch starts, and the dispatch loop then
//! blocks it between incoming events. Handlers therefore run strictly
//! sequentially and the validate-commit-republish cycle is atomic with
//! respect to other inbound messages without any locking.
//!
//! ## Observability Contract
//!
//! A retained `"1"`/`"0"` flag on the per-device connection-state topic,
//! backed by a broker-delivered last will, lets any subscriber distinguish
//! "device online" from "device offline" even after ungraceful termination.

pub mod connection;
pub mod daemon;
pub mod error;

pub use connection::BusLink;
pub use daemon::{BusSession, StateSyncDaemon};
pub use error::SyncError;
