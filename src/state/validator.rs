//! All-or-nothing validation of inbound state-update payloads.
//!
//! A payload either yields a fully-populated [`StateUpdate`] covering the
//! active profile's required fields, or a tagged rejection. The first
//! failing field aborts the whole payload; callers branch on the tag and
//! the record stays untouched. Unknown keys (such as the `client` tag the
//! override tool appends) are ignored.

use serde_json::Value;
use thiserror::Error;

use super::{round2, SchemaProfile, StateUpdate};

/// Why an inbound payload was dropped. Rejections are logged by the caller;
/// there is no reply on the bus and no retry of the specific message.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Not UTF-8, not JSON, or not a JSON object.
    #[error("malformed payload: not a UTF-8 JSON object")]
    MalformedPayload,

    /// A field required by the active profile is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A required field is present but carries no finite number.
    #[error("invalid value for `{field}`: {raw}")]
    InvalidValue { field: &'static str, raw: String },
}

/// Decodes and checks one payload against the profile's required fields.
/// Every accepted value is finite and rounded to 2 decimals.
pub fn validate(profile: &SchemaProfile, payload: &[u8]) -> Result<StateUpdate, ValidationError> {
    let text = std::str::from_utf8(payload).map_err(|_| ValidationError::MalformedPayload)?;
    let document: Value =
        serde_json::from_str(text).map_err(|_| ValidationError::MalformedPayload)?;
    let object = document
        .as_object()
        .ok_or(ValidationError::MalformedPayload)?;

    let mut values = Vec::with_capacity(profile.required().len());
    for &field in profile.required() {
        let raw = object
            .get(field.key())
            .ok_or(ValidationError::MissingField(field.key()))?;
        let value = coerce(raw).ok_or_else(|| ValidationError::InvalidValue {
            field: field.key(),
            raw: raw.to_string(),
        })?;
        values.push((field, round2(value)));
    }

    Ok(StateUpdate::new(values))
}

/// Accepts JSON numbers and numeric strings; everything else, and any
/// non-finite result, is invalid.
fn coerce(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Field;

    fn profile() -> SchemaProfile {
        SchemaProfile::standard()
    }

    #[test]
    fn complete_payload_is_accepted_and_rounded() {
        let payload =
            br#"{"pm2_5":80.123,"pm10":10,"temperature":22.456,"humidity":40,"pressure":1000.005}"#;
        let update = validate(&profile(), payload).expect("accepted");

        let values: Vec<(Field, f64)> = update.values().to_vec();
        assert_eq!(values[0], (Field::Pm25, 80.12));
        assert_eq!(values[1], (Field::Pm10, 10.0));
        assert_eq!(values[2], (Field::Temperature, 22.46));
        assert_eq!(values[3], (Field::Humidity, 40.0));
        assert_eq!(values[4], (Field::Pressure, 1000.0));
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let payload = br#"{"pm2_5":"80.5","pm10":"10","temperature":"22","humidity":"40","pressure":"1000"}"#;
        let update = validate(&profile(), payload).expect("accepted");
        assert_eq!(update.values()[0], (Field::Pm25, 80.5));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let payload = br#"{"pm2_5":1,"pm10":2,"temperature":3,"humidity":4,"pressure":5,"client":"air_quality_cmd"}"#;
        assert!(validate(&profile(), payload).is_ok());
    }

    #[test]
    fn missing_field_rejects_the_whole_payload() {
        let payload = br#"{"pm2_5":80,"pm10":10,"temperature":22,"humidity":40}"#;
        assert_eq!(
            validate(&profile(), payload),
            Err(ValidationError::MissingField("pressure"))
        );
    }

    #[test]
    fn non_numeric_value_is_tagged_with_field_and_raw() {
        let payload =
            br#"{"pm2_5":80,"pm10":"dusty","temperature":22,"humidity":40,"pressure":1000}"#;
        assert_eq!(
            validate(&profile(), payload),
            Err(ValidationError::InvalidValue {
                field: "pm10",
                raw: "\"dusty\"".to_string(),
            })
        );
    }

    #[test]
    fn non_finite_string_value_is_invalid() {
        let payload =
            br#"{"pm2_5":80,"pm10":10,"temperature":"NaN","humidity":40,"pressure":1000}"#;
        assert!(matches!(
            validate(&profile(), payload),
            Err(ValidationError::InvalidValue { field: "temperature", .. })
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert_eq!(
            validate(&profile(), b"pm2_5=80"),
            Err(ValidationError::MalformedPayload)
        );
        assert_eq!(
            validate(&profile(), b"[1,2,3]"),
            Err(ValidationError::MalformedPayload)
        );
        assert_eq!(
            validate(&profile(), &[0xff, 0xfe]),
            Err(ValidationError::MalformedPayload)
        );
    }

    #[test]
    fn altitude_profile_requires_altitude() {
        let payload = br#"{"pm2_5":80,"pm10":10,"temperature":22,"humidity":40,"pressure":1000}"#;
        assert_eq!(
            validate(&SchemaProfile::with_altitude(), payload),
            Err(ValidationError::MissingField("altitude"))
        );
    }
}
