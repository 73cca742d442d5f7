//! MQTT topic names shared by the daemon and its peers.
//!
//! All traffic for one device lives under the `air_quality_monitor/` prefix.
//! The connection-state topic is namespaced by device identity so that a
//! fleet bridged through a central broker stays distinguishable.

use crate::identity::DeviceIdentity;

/// Inbound readings and manual overrides (QoS 1, not retained).
pub const SENSOR_UPDATE: &str = "air_quality_monitor/set_sensor_data";

/// Full current state, republished retained after every commit (QoS 1).
pub const STATE_NOTIFICATION: &str = "air_quality_monitor/sensor_change_notification";

/// Online/offline flag topic for this device (QoS 2, retained).
///
/// Also registered as the last-will topic, so the broker flips it to `"0"`
/// on ungraceful termination.
pub fn connection_state_topic(device: &DeviceIdentity) -> String {
    format!("air_quality_monitor/connection/{}/state", device)
}

/// Status topic of the per-device broker bridge, maintained by the broker
/// itself. The daemon never subscribes to it; dashboard collaborators do.
pub fn broker_bridge_topic(device: &DeviceIdentity) -> String {
    format!("$SYS/broker/connection/{}_broker/state", device)
}

/// MQTT filter match, including `+` (single level) and `#` (multi level).
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(expected), Some(level)) if expected == level => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::from_raw("b827eb974fea").expect("valid identity")
    }

    #[test]
    fn connection_state_topic_is_device_scoped() {
        assert_eq!(
            connection_state_topic(&identity()),
            "air_quality_monitor/connection/b827eb974fea/state"
        );
    }

    #[test]
    fn bridge_topic_matches_broker_convention() {
        assert_eq!(
            broker_bridge_topic(&identity()),
            "$SYS/broker/connection/b827eb974fea_broker/state"
        );
    }

    #[test]
    fn exact_filters_match_exactly() {
        assert!(topic_matches(SENSOR_UPDATE, SENSOR_UPDATE));
        assert!(!topic_matches(SENSOR_UPDATE, STATE_NOTIFICATION));
        assert!(!topic_matches(SENSOR_UPDATE, "air_quality_monitor"));
    }

    #[test]
    fn single_level_wildcard_spans_one_level() {
        assert!(topic_matches(
            "air_quality_monitor/connection/+/state",
            "air_quality_monitor/connection/b827eb974fea/state"
        ));
        assert!(!topic_matches(
            "air_quality_monitor/connection/+/state",
            "air_quality_monitor/connection/a/b/state"
        ));
    }

    #[test]
    fn multi_level_wildcard_spans_the_rest() {
        assert!(topic_matches("air_quality_monitor/#", SENSOR_UPDATE));
        assert!(topic_matches("air_quality_monitor/#", "air_quality_monitor"));
        assert!(!topic_matches("air_quality_monitor/#", "other/prefix"));
    }
}
