//! `user_led` topic: on/off state of the eight user LEDs

use serde::Deserialize;

use crate::error::DecodeError;
use crate::pipeline::JsonRecord;

/// Number of user LEDs
pub const USER_LED_COUNT: usize = 8;

/// Decoded user LED configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserLedConfig {
    /// LED states, index 0 = `led0`
    pub leds: [bool; USER_LED_COUNT],
}

impl UserLedConfig {
    /// LED states packed into a byte (LSB = `led0`)
    pub fn bits(&self) -> u8 {
        self.leds
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }
}

#[derive(Debug, Deserialize)]
pub struct UserLedWire {
    led0: String,
    led1: String,
    led2: String,
    led3: String,
    led4: String,
    led5: String,
    led6: String,
    led7: String,
}

fn parse_state(led: usize, value: &str) -> Result<bool, DecodeError> {
    if value.eq_ignore_ascii_case("on") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("off") {
        Ok(false)
    } else {
        Err(DecodeError::out_of_range(format!("led{led} = {value:?}")))
    }
}

impl JsonRecord for UserLedConfig {
    type Wire = UserLedWire;
    const NAME: &'static str = "user_led";

    fn from_wire(wire: UserLedWire) -> Result<Self, DecodeError> {
        let states = [
            wire.led0, wire.led1, wire.led2, wire.led3, wire.led4, wire.led5, wire.led6, wire.led7,
        ];

        let mut leds = [false; USER_LED_COUNT];
        for (i, state) in states.iter().enumerate() {
            leds[i] = parse_state(i, state)?;
        }

        Ok(UserLedConfig { leds })
    }
}
