//! Per-message orchestration: validate, commit, re-light, republish.
//!
//! The daemon owns every collaborator a handler needs (store, profile,
//! indicator driver, topic registry) in one explicit context instead of
//! process-wide singletons, and talks to the bus through the narrow
//! [`BusSession`] seam so the whole cycle runs under test without a broker.

use rumqttc::{Client, QoS};
use tracing::{debug, error, info, warn};

use crate::indicator::{color_for, IndicatorDriver};
use crate::state::store::StateStore;
use crate::state::validator::validate;
use crate::state::SchemaProfile;
use crate::sync::error::SyncError;
use crate::topics;

/// Publish/subscribe surface the daemon needs from a bus client.
pub trait BusSession {
    fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), SyncError>;

    fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), SyncError>;
}

impl BusSession for Client {
    fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), SyncError> {
        Client::publish(self, topic, qos, retain, payload)
            .map_err(|err| SyncError::Bus(err.to_string()))
    }

    fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), SyncError> {
        Client::subscribe(self, topic, qos).map_err(|err| SyncError::Bus(err.to_string()))
    }
}

/// Handlers reachable through the topic registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    SensorUpdate,
}

/// Maps subscription filters to handlers, resolved once at startup so a
/// filter cannot end up with zero or two handlers at runtime.
struct TopicRegistry {
    routes: Vec<(String, QoS, Route)>,
}

impl TopicRegistry {
    fn new() -> Self {
        Self { routes: Vec::new() }
    }

    fn register(&mut self, filter: &str, qos: QoS, route: Route) -> Result<(), SyncError> {
        // Overlap in either direction means a topic could reach two handlers.
        let conflict = self.routes.iter().any(|(existing, _, _)| {
            topics::topic_matches(existing, filter) || topics::topic_matches(filter, existing)
        });
        if conflict {
            return Err(SyncError::DuplicateRoute(filter.to_string()));
        }

        self.routes.push((filter.to_string(), qos, route));
        Ok(())
    }

    fn resolve(&self, topic: &str) -> Option<Route> {
        self.routes
            .iter()
            .find(|(filter, _, _)| topics::topic_matches(filter, topic))
            .map(|&(_, _, route)| route)
    }

    fn subscriptions(&self) -> impl Iterator<Item = (&str, QoS)> {
        self.routes
            .iter()
            .map(|(filter, qos, _)| (filter.as_str(), *qos))
    }
}

/// Context object wiring store, validator, threshold rules, indicator
/// driver and topic routing into the request cycle for one inbound update.
pub struct StateSyncDaemon {
    store: StateStore,
    profile: SchemaProfile,
    driver: Box<dyn IndicatorDriver>,
    registry: TopicRegistry,
    status_topic: String,
}

impl StateSyncDaemon {
    pub fn new(
        store: StateStore,
        profile: SchemaProfile,
        driver: Box<dyn IndicatorDriver>,
        status_topic: String,
    ) -> Result<Self, SyncError> {
        let mut registry = TopicRegistry::new();
        registry.register(topics::SENSOR_UPDATE, QoS::AtLeastOnce, Route::SensorUpdate)?;

        info!(
            "daemon ready: profile `{}`, state record {}",
            profile.name(),
            store.path().display()
        );
        Ok(Self {
            store,
            profile,
            driver,
            registry,
            status_topic,
        })
    }

    /// On-connect sequence, re-run on every session (re)establishment:
    /// announce online, re-issue subscriptions (they do not survive a
    /// reconnect), refresh the indicator and republish the full state so
    /// subscribers catch up on anything missed during the gap.
    pub fn on_connected(&mut self, bus: &dyn BusSession) {
        if let Err(err) =
            bus.publish(&self.status_topic, QoS::ExactlyOnce, true, b"1".to_vec())
        {
            error!("failed to announce online state: {}", err);
        }

        for (filter, qos) in self.registry.subscriptions() {
            match bus.subscribe(filter, qos) {
                Ok(()) => debug!("subscribed to {}", filter),
                Err(err) => error!("failed to subscribe to {}: {}", filter, err),
            }
        }

        self.refresh_indicator();
        self.republish_state(bus);
    }

    /// Routes one incoming message. Anything without a registered handler
    /// is logged and dropped, never an error.
    pub fn dispatch(&mut self, bus: &dyn BusSession, topic: &str, payload: &[u8]) {
        match self.registry.resolve(topic) {
            Some(Route::SensorUpdate) => self.handle_sensor_update(bus, topic, payload),
            None => warn!(
                "unexpected message on topic {} with payload '{}'",
                topic,
                String::from_utf8_lossy(payload)
            ),
        }
    }

    /// The full cycle for one inbound update: validate, commit durably,
    /// recompute the indicator, republish retained. Commit happens before
    /// the republish so the record is always at least as fresh as what is
    /// announced on the bus.
    fn handle_sensor_update(&mut self, bus: &dyn BusSession, topic: &str, payload: &[u8]) {
        let update = match validate(&self.profile, payload) {
            Ok(update) => update,
            Err(rejection) => {
                warn!("dropping update on {}: {}", topic, rejection);
                return;
            }
        };

        if let Err(err) = self.store.commit_and_flush(&update) {
            error!("failed to persist accepted update: {}", err);
            return;
        }

        self.refresh_indicator();
        self.republish_state(bus);
    }

    /// Recomputes the color from the committed state and drives the LED.
    /// Fire-and-forget: driver failures are logged, never fatal.
    fn refresh_indicator(&mut self) {
        let color = color_for(self.store.state());
        if let Err(err) = self.driver.apply(color) {
            warn!("indicator driver failure: {}", err);
        }
    }

    /// Publishes the full current state retained, so late joiners get the
    /// last known-good reading immediately.
    fn republish_state(&self, bus: &dyn BusSession) {
        let payload = self.profile.render(self.store.state()).to_string();
        if let Err(err) = bus.publish(
            topics::STATE_NOTIFICATION,
            QoS::AtLeastOnce,
            true,
            payload.into_bytes(),
        ) {
            error!("failed to republish state: {}", err);
        }
    }

    #[cfg(test)]
    fn store(&self) -> &StateStore {
        &self.store
    }
}
