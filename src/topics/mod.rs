//! Standard topics
//!
//! Decoders and record types for the four topics every deployment carries:
//!
//! | Topic      | Written by            | Format                  |
//! |------------|-----------------------|-------------------------|
//! | `logger`   | remote ingestion      | JSON                    |
//! | `rgb_led`  | remote ingestion      | JSON                    |
//! | `user_led` | remote ingestion      | JSON                    |
//! | `system`   | local sensor producer | fixed 17-byte layout    |

pub mod logger;
pub mod rgb_led;
pub mod system;
pub mod user_led;

pub use logger::{LogLevel, LoggerConfig};
pub use rgb_led::{Rgb, RgbLedConfig};
pub use system::{SystemConfig, SystemDecoder};
pub use user_led::UserLedConfig;

use crate::pipeline::JsonDecoder;
use crate::topic::TopicSpec;

/// Logger topic name
pub const LOGGER: &str = "logger";
/// RGB LED topic name
pub const RGB_LED: &str = "rgb_led";
/// User LED topic name
pub const USER_LED: &str = "user_led";
/// System topic name
pub const SYSTEM: &str = "system";

/// The standard topic table
///
/// All topics are single-writer and use the broker's default minimum
/// interval.
pub fn standard_topics() -> Vec<TopicSpec> {
    vec![
        TopicSpec::new(LOGGER).decoder(JsonDecoder::<LoggerConfig>::new()),
        TopicSpec::new(RGB_LED).decoder(JsonDecoder::<RgbLedConfig>::new()),
        TopicSpec::new(USER_LED).decoder(JsonDecoder::<UserLedConfig>::new()),
        TopicSpec::new(SYSTEM).decoder(SystemDecoder),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_topics() {
        let topics = standard_topics();
        let names: Vec<_> = topics.iter().map(|t| t.name.as_str()).collect();

        assert_eq!(names, vec!["logger", "rgb_led", "user_led", "system"]);
        assert!(topics.iter().all(|t| t.validate().is_ok()));
        assert!(topics.iter().all(|t| t.decoder.is_some()));
    }
}
