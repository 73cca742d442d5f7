//! Broker session lifecycle with a statum state machine.
//!
//! # State Machine
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected
//!                      │              │
//!                      ▼              ▼
//!                   Failed      (transport drop: the event loop retries,
//!                                the broker delivers the "0" last will)
//! ```
//!
//! Connecting is entered once per process start. Connection refusal is
//! retried once per second against a wall-clock deadline counted from the
//! first attempt; past the deadline the error is fatal and the process is
//! expected to exit so a supervisor can restart it. After the first CONNACK
//! the session never leaves Connected: later transport drops are logged and
//! the underlying event loop reconnects on its own, which surfaces a fresh
//! CONNACK to the dispatch loop and re-runs the on-connect sequence.

use std::thread;
use std::time::{Duration, Instant};

use rumqttc::{Client, Connection, Event, LastWill, MqttOptions, Packet, QoS};
use statum::{machine, state};
use tracing::{error, info, warn};

use crate::config::BrokerConfig;
use crate::sync::daemon::StateSyncDaemon;
use crate::sync::error::SyncError;

/// Pause between connection attempts, and between reconnect polls after a
/// transport drop.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Wall-clock budget for the initial connect, counted from the first
/// attempt. Retries are unbounded inside it and forbidden after it.
#[derive(Debug, Clone)]
pub struct StartupDeadline {
    started: Instant,
    limit: Duration,
}

impl StartupDeadline {
    pub fn new(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    #[cfg(test)]
    fn started_at(started: Instant, limit: Duration) -> Self {
        Self { started, limit }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum LinkState {
    Disconnected, // client built, nothing on the wire yet
    Connecting,   // startup loop driving the first CONNACK
    Connected,    // session up, dispatch loop owns the thread
    Failed,       // startup deadline exceeded
}

/// One session to the message bus, with compile-time lifecycle safety.
#[machine]
pub struct BusLink<S: LinkState> {
    client: Client,
    connection: Connection,
    startup_limit: Duration,
}

impl BusLink<Disconnected> {
    /// Builds the client and registers the retained `"0"` last will on the
    /// connection-state topic before anything touches the wire.
    pub fn create(broker: &BrokerConfig, status_topic: &str) -> Self {
        let mut options = MqttOptions::new(&broker.client_id, &broker.host, broker.port);
        options.set_keep_alive(Duration::from_secs(broker.keep_alive_secs));
        options.set_last_will(LastWill::new(
            status_topic,
            b"0".to_vec(),
            QoS::ExactlyOnce,
            true,
        ));

        let (client, connection) = Client::new(options, 64);

        info!(
            "bus client `{}` prepared for {}:{}",
            broker.client_id, broker.host, broker.port
        );
        Self::new(
            client,
            connection,
            Duration::from_secs(broker.startup_deadline_secs),
        )
    }

    pub fn connect(self) -> Result<BusLink<Connected>, SyncError> {
        let link: BusLink<Connecting> = self.transition();
        link.wait_for_session()
    }
}

impl BusLink<Connecting> {
    /// Drives the event loop until the first CONNACK. Refusals are retried
    /// once per second while the deadline allows it.
    fn wait_for_session(mut self) -> Result<BusLink<Connected>, SyncError> {
        let deadline = StartupDeadline::new(self.startup_limit);
        let mut established = false;

        for event in self.connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    established = true;
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    if deadline.expired() {
                        error!(
                            "broker still unreachable after {} s: {}",
                            deadline.elapsed().as_secs(),
                            err
                        );
                        break;
                    }
                    warn!(
                        "connection attempt failed, retrying (elapsed {} s): {}",
                        deadline.elapsed().as_secs(),
                        err
                    );
                    thread::sleep(RETRY_INTERVAL);
                }
            }
        }

        if established {
            info!("connected to broker");
            Ok(self.transition())
        } else {
            let limit = deadline.limit();
            let _failed: BusLink<Failed> = self.transition();
            Err(SyncError::StartupDeadline { limit })
        }
    }
}

impl BusLink<Connected> {
    /// Blocking single-threaded dispatch loop. Runs the on-connect sequence
    /// for the session just established, then routes every incoming publish
    /// through the daemon. Transport drops are logged and ridden out; each
    /// reconnect surfaces a CONNACK that re-runs the on-connect sequence.
    pub fn run(mut self, daemon: &mut StateSyncDaemon) -> Result<(), SyncError> {
        daemon.on_connected(&self.client);

        for event in self.connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("session (re)established");
                    daemon.on_connected(&self.client);
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    daemon.dispatch(&self.client, &publish.topic, &publish.payload);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("transport error, waiting for reconnect: {}", err);
                    thread::sleep(RETRY_INTERVAL);
                }
            }
        }

        Ok(())
    }
}

impl BusLink<Failed> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_deadline_allows_retries() {
        let deadline = StartupDeadline::new(Duration::from_secs(10));
        assert!(!deadline.expired());
    }

    #[test]
    fn deadline_expires_after_its_limit() {
        let deadline = StartupDeadline::started_at(
            Instant::now() - Duration::from_secs(11),
            Duration::from_secs(10),
        );
        assert!(deadline.expired());
    }

    #[test]
    fn deadline_is_inclusive_at_the_limit() {
        let deadline = StartupDeadline::started_at(
            Instant::now() - Duration::from_secs(10),
            Duration::from_secs(10),
        );
        assert!(deadline.expired());
    }

    #[test]
    fn retries_stay_inside_the_limit() {
        let deadline = StartupDeadline::started_at(
            Instant::now() - Duration::from_millis(9_500),
            Duration::from_secs(10),
        );
        // One more 1 s retry is allowed; the fatal error lands within one
        // retry interval past the configured limit.
        assert!(!deadline.expired());
        assert!(deadline.elapsed() + RETRY_INTERVAL < deadline.limit() + RETRY_INTERVAL * 2);
    }
}
