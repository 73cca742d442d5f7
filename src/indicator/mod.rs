//! Tri-color indicator derived from the current sensor state.
//!
//! The mapping is a pure function re-evaluated after every committed state
//! change and on every (re)connect. There is deliberately no hysteresis: a
//! reading oscillating around a threshold flaps the indicator, and smoothing
//! it would hide exactly the borderline air the indicator exists to show.
//!
//! Drivers sit behind [`IndicatorDriver`]; a failing driver is logged and
//! never interferes with state handling or bus connectivity.

pub mod led;

use std::fmt;

use thiserror::Error;
use tracing::info;

use crate::state::SensorState;

/// Humidity above this turns the indicator yellow.
pub const HUMIDITY_YELLOW_ABOVE: f64 = 80.0;
/// PM2.5 above this turns the indicator red.
pub const PM2_5_RED_ABOVE: f64 = 75.0;
/// PM10 above this turns the indicator red.
pub const PM10_RED_ABOVE: f64 = 150.0;

/// Discrete color command for the indicator LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorColor {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for IndicatorColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndicatorColor::Green => "green",
            IndicatorColor::Yellow => "yellow",
            IndicatorColor::Red => "red",
        };
        f.write_str(name)
    }
}

/// First matching rule wins; rules never combine.
pub fn color_for(state: &SensorState) -> IndicatorColor {
    if state.humidity > HUMIDITY_YELLOW_ABOVE {
        IndicatorColor::Yellow
    } else if state.pm2_5 > PM2_5_RED_ABOVE || state.pm10 > PM10_RED_ABOVE {
        IndicatorColor::Red
    } else {
        IndicatorColor::Green
    }
}

#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("gpio access failed: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

/// Boundary to whatever physically shows the color.
pub trait IndicatorDriver {
    fn apply(&mut self, color: IndicatorColor) -> Result<(), IndicatorError>;
}

/// Fallback driver for hosts without the LED hardware: logs the color.
#[derive(Debug, Default)]
pub struct LogIndicator;

impl IndicatorDriver for LogIndicator {
    fn apply(&mut self, color: IndicatorColor) -> Result<(), IndicatorError> {
        info!("indicator -> {}", color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pm2_5: f64, pm10: f64, humidity: f64) -> SensorState {
        SensorState {
            pm2_5,
            pm10,
            humidity,
            ..SensorState::default()
        }
    }

    #[test]
    fn clean_air_is_green() {
        assert_eq!(color_for(&SensorState::default()), IndicatorColor::Green);
    }

    #[test]
    fn humidity_threshold_is_strict() {
        assert_eq!(color_for(&state(0.0, 0.0, 80.0)), IndicatorColor::Green);
        assert_eq!(color_for(&state(0.0, 0.0, 80.01)), IndicatorColor::Yellow);
    }

    #[test]
    fn particulate_thresholds_are_strict() {
        assert_eq!(color_for(&state(75.0, 0.0, 0.0)), IndicatorColor::Green);
        assert_eq!(color_for(&state(75.01, 0.0, 0.0)), IndicatorColor::Red);
        assert_eq!(color_for(&state(0.0, 150.0, 0.0)), IndicatorColor::Green);
        assert_eq!(color_for(&state(0.0, 150.01, 0.0)), IndicatorColor::Red);
    }

    #[test]
    fn humidity_rule_wins_over_particulates() {
        assert_eq!(color_for(&state(80.0, 200.0, 85.0)), IndicatorColor::Yellow);
    }

    #[test]
    fn recomputing_identical_state_yields_identical_command() {
        let sample = state(80.0, 10.0, 40.0);
        assert_eq!(color_for(&sample), color_for(&sample));
        assert_eq!(color_for(&sample), IndicatorColor::Red);
    }
}
