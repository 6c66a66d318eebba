//! `logger` topic: where and how verbosely to ship logs

use std::net::IpAddr;

use serde::Deserialize;

use crate::error::DecodeError;
use crate::pipeline::JsonRecord;

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded logger configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Log host address
    pub address: IpAddr,
    /// Log host port
    pub port: u16,
    /// Minimum level to ship
    pub level: LogLevel,
}

#[derive(Debug, Deserialize)]
pub struct LoggerWire {
    host: HostWire,
    level: String,
}

#[derive(Debug, Deserialize)]
struct HostWire {
    address: String,
    port: i64,
}

impl JsonRecord for LoggerConfig {
    type Wire = LoggerWire;
    const NAME: &'static str = "logger";

    fn from_wire(wire: LoggerWire) -> Result<Self, DecodeError> {
        let address = wire.host.address.parse::<IpAddr>().map_err(|_| {
            DecodeError::out_of_range(format!("host.address = {:?}", wire.host.address))
        })?;

        let port = u16::try_from(wire.host.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| DecodeError::out_of_range(format!("host.port = {}", wire.host.port)))?;

        let level = LogLevel::parse(&wire.level)
            .ok_or_else(|| DecodeError::out_of_range(format!("level = {:?}", wire.level)))?;

        Ok(LoggerConfig {
            address,
            port,
            level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::JsonDecoder;

    fn decode(raw: &str) -> Result<LoggerConfig, DecodeError> {
        JsonDecoder::<LoggerConfig>::new().decode_record(raw.as_bytes())
    }

    #[test]
    fn test_valid_logger() {
        let config = decode(
            r#"{"host":{"address":"100.101.102.103","port":666},"level":"WARN"}"#,
        )
        .unwrap();

        assert_eq!(config.address, "100.101.102.103".parse::<IpAddr>().unwrap());
        assert_eq!(config.port, 666);
        assert_eq!(config.level, LogLevel::Warn);
    }

    #[test]
    fn test_invalid_address_and_port() {
        let err = decode(r#"{"host":{"address":"invalidAddress","port":0},"level":"info"}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange(_)));

        let err = decode(r#"{"host":{"address":"10.0.0.1","port":0},"level":"info"}"#)
            .unwrap_err();
        assert_eq!(err, DecodeError::OutOfRange("host.port = 0".into()));

        let err = decode(r#"{"host":{"address":"10.0.0.1","port":65536},"level":"info"}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange(_)));
    }

    #[test]
    fn test_unknown_level() {
        let err = decode(r#"{"host":{"address":"::1","port":514},"level":"verbose"}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange(_)));
    }

    #[test]
    fn test_missing_host() {
        let err = decode(r#"{"level":"info"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}
