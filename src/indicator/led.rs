//! RGB LED driver on Raspberry Pi GPIO pins.

use rppal::gpio::{Gpio, Level, OutputPin};
use tracing::debug;

use super::{IndicatorColor, IndicatorDriver, IndicatorError};

/// Common-cathode RGB LED on three GPIO pins. Yellow is red plus green;
/// the blue channel is held low but claimed so nothing else drives it.
pub struct RgbLed {
    red: OutputPin,
    green: OutputPin,
    blue: OutputPin,
}

impl RgbLed {
    pub fn open(red_pin: u8, green_pin: u8, blue_pin: u8) -> Result<Self, IndicatorError> {
        let gpio = Gpio::new()?;

        let mut red = gpio.get(red_pin)?.into_output();
        let mut green = gpio.get(green_pin)?.into_output();
        let mut blue = gpio.get(blue_pin)?.into_output();
        red.set_low();
        green.set_low();
        blue.set_low();

        debug!(
            "rgb led claimed on pins r={} g={} b={}",
            red_pin, green_pin, blue_pin
        );
        Ok(Self { red, green, blue })
    }

    fn levels(color: IndicatorColor) -> (Level, Level) {
        match color {
            IndicatorColor::Green => (Level::Low, Level::High),
            IndicatorColor::Yellow => (Level::High, Level::High),
            IndicatorColor::Red => (Level::High, Level::Low),
        }
    }
}

impl IndicatorDriver for RgbLed {
    fn apply(&mut self, color: IndicatorColor) -> Result<(), IndicatorError> {
        let (red, green) = Self::levels(color);
        self.red.write(red);
        self.green.write(green);
        self.blue.write(Level::Low);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yellow_mixes_red_and_green() {
        assert_eq!(
            RgbLed::levels(IndicatorColor::Yellow),
            (Level::High, Level::High)
        );
        assert_eq!(
            RgbLed::levels(IndicatorColor::Green),
            (Level::Low, Level::High)
        );
        assert_eq!(
            RgbLed::levels(IndicatorColor::Red),
            (Level::High, Level::Low)
        );
    }
}
