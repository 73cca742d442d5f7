//! # Sensor State Model
//!
//! The single authoritative record of one device's environmental readings,
//! together with the schema profiles that decide which fields a deployment
//! actually carries.
//!
//! ## Module Architecture
//!
//! ```text
//! state/
//! ├── validator.rs - all-or-nothing payload validation
//! └── store.rs     - durable on-disk record with explicit flush
//! ```
//!
//! ## Invariants
//!
//! - Every accepted value is a finite float rounded to exactly 2 decimals.
//! - Updates replace the whole required field set or nothing at all; the
//!   rejection path never touches the record.
//! - Fields a profile does not require keep their stored value (0.0 on a
//!   fresh device) and are omitted from outbound payloads.

pub mod store;
pub mod validator;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current readings of one device. Fields default to 0.0 on first start and
/// are only ever replaced through the validate-then-commit path.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorState {
    pub pm2_5: f64,
    pub pm10: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub altitude: f64,
}

/// One field of [`SensorState`], addressable by its wire key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Pm25,
    Pm10,
    Temperature,
    Humidity,
    Pressure,
    Altitude,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Pm25,
        Field::Pm10,
        Field::Temperature,
        Field::Humidity,
        Field::Pressure,
        Field::Altitude,
    ];

    /// Key used in payloads and in the on-disk record.
    pub fn key(self) -> &'static str {
        match self {
            Field::Pm25 => "pm2_5",
            Field::Pm10 => "pm10",
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Pressure => "pressure",
            Field::Altitude => "altitude",
        }
    }

    pub fn get(self, state: &SensorState) -> f64 {
        match self {
            Field::Pm25 => state.pm2_5,
            Field::Pm10 => state.pm10,
            Field::Temperature => state.temperature,
            Field::Humidity => state.humidity,
            Field::Pressure => state.pressure,
            Field::Altitude => state.altitude,
        }
    }

    pub fn set(self, state: &mut SensorState, value: f64) {
        match self {
            Field::Pm25 => state.pm2_5 = value,
            Field::Pm10 => state.pm10 = value,
            Field::Temperature => state.temperature = value,
            Field::Humidity => state.humidity = value,
            Field::Pressure => state.pressure = value,
            Field::Altitude => state.altitude = value,
        }
    }
}

const STANDARD_FIELDS: &[Field] = &[
    Field::Pm25,
    Field::Pm10,
    Field::Temperature,
    Field::Humidity,
    Field::Pressure,
];

const ALTITUDE_FIELDS: &[Field] = &[
    Field::Pm25,
    Field::Pm10,
    Field::Temperature,
    Field::Humidity,
    Field::Pressure,
    Field::Altitude,
];

/// Required field set of one deployment profile.
///
/// Selected by configuration, so variants with extra sensors share one
/// schema definition instead of forked validation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaProfile {
    name: &'static str,
    required: &'static [Field],
}

impl SchemaProfile {
    /// Particulate and BME280 readings without the altitude channel.
    pub const fn standard() -> Self {
        Self {
            name: "standard",
            required: STANDARD_FIELDS,
        }
    }

    /// Deployments with a calibrated sea-level reference also carry altitude.
    pub const fn with_altitude() -> Self {
        Self {
            name: "altitude",
            required: ALTITUDE_FIELDS,
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::standard()),
            "altitude" => Some(Self::with_altitude()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn required(&self) -> &'static [Field] {
        self.required
    }

    /// Full current state as a JSON object covering this profile's fields.
    pub fn render(&self, state: &SensorState) -> Value {
        let mut object = serde_json::Map::new();
        for field in self.required {
            object.insert(field.key().to_string(), Value::from(field.get(state)));
        }
        Value::Object(object)
    }
}

/// Validated, fully-populated replacement for a profile's field set.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    values: Vec<(Field, f64)>,
}

impl StateUpdate {
    pub(crate) fn new(values: Vec<(Field, f64)>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[(Field, f64)] {
        &self.values
    }
}

/// Rounds to 2 decimal places, the resolution every stored value carries.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
