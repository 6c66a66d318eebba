//! `rgb_led` topic: colour of the two RGB LEDs

use serde::Deserialize;

use crate::error::DecodeError;
use crate::pipeline::JsonRecord;

/// One LED colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// Decoded RGB LED configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RgbLedConfig {
    pub led0: Rgb,
    pub led1: Rgb,
}

#[derive(Debug, Deserialize)]
pub struct RgbLedWire {
    led0: RgbWire,
    led1: RgbWire,
}

#[derive(Debug, Deserialize)]
struct RgbWire {
    red: i64,
    green: i64,
    blue: i64,
}

fn channel(led: &str, name: &str, value: i64) -> Result<u8, DecodeError> {
    u8::try_from(value).map_err(|_| DecodeError::out_of_range(format!("{led}.{name} = {value}")))
}

impl RgbWire {
    fn validate(self, led: &str) -> Result<Rgb, DecodeError> {
        Ok(Rgb {
            red: channel(led, "red", self.red)?,
            green: channel(led, "green", self.green)?,
            blue: channel(led, "blue", self.blue)?,
        })
    }
}

impl JsonRecord for RgbLedConfig {
    type Wire = RgbLedWire;
    const NAME: &'static str = "rgb_led";

    fn from_wire(wire: RgbLedWire) -> Result<Self, DecodeError> {
        Ok(RgbLedConfig {
            led0: wire.led0.validate("led0")?,
            led1: wire.led1.validate("led1")?,
        })
    }
}
