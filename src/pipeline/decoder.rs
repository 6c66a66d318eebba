//! Per-topic decoder plug-in interface
//!
//! A decoder turns the raw bytes of an update into a validated, typed record.
//! The pipeline treats every decoder the same way; each one defines its own
//! fields and legal ranges.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::DecodeError;
use crate::snapshot::Record;

/// Decoder for one topic's update format
pub trait Decoder: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Decode and validate `raw`
    fn decode(&self, raw: &[u8]) -> Result<Record, DecodeError>;
}

/// A typed configuration record decoded from JSON
///
/// `Wire` is the permissive shape parsed by serde; `from_wire` applies the
/// record's range checks.
pub trait JsonRecord: Sized + Send + Sync + 'static {
    /// Deserialized form, before range validation
    type Wire: DeserializeOwned;

    /// Decoder name used in logs
    const NAME: &'static str;

    /// Validate the wire form
    fn from_wire(wire: Self::Wire) -> Result<Self, DecodeError>;
}

/// Decoder for any [`JsonRecord`]
///
/// Unparsable JSON and JSON of the wrong shape are `Malformed`; range
/// violations reported by `from_wire` are `OutOfRange`.
pub struct JsonDecoder<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T: JsonRecord> JsonDecoder<T> {
    /// Create a decoder
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }

    /// Decode into the concrete record type
    pub fn decode_record(&self, raw: &[u8]) -> Result<T, DecodeError> {
        let wire: T::Wire = serde_json::from_slice(raw)?;
        T::from_wire(wire)
    }
}

impl<T: JsonRecord> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: JsonRecord> Decoder for JsonDecoder<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn decode(&self, raw: &[u8]) -> Result<Record, DecodeError> {
        self.decode_record(raw).map(Record::new)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Percent(u8);

    #[derive(Deserialize)]
    struct PercentWire {
        value: i64,
    }

    impl JsonRecord for Percent {
        type Wire = PercentWire;
        const NAME: &'static str = "percent";

        fn from_wire(wire: PercentWire) -> Result<Self, DecodeError> {
            if (0..=100).contains(&wire.value) {
                Ok(Percent(wire.value as u8))
            } else {
                Err(DecodeError::out_of_range(format!("value = {}", wire.value)))
            }
        }
    }

    #[test]
    fn test_json_decoder_ok() {
        let decoder = JsonDecoder::<Percent>::new();
        let record = decoder.decode(br#"{"value": 42}"#).unwrap();
        assert_eq!(record.downcast_ref::<Percent>(), Some(&Percent(42)));
        assert_eq!(decoder.name(), "percent");
    }

    #[test]
    fn test_json_decoder_truncated() {
        let decoder = JsonDecoder::<Percent>::new();
        let err = decoder.decode(br#"{"x":"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_json_decoder_missing_field() {
        let decoder = JsonDecoder::<Percent>::new();
        let err = decoder.decode(br#"{"other": 1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_json_decoder_out_of_range() {
        let decoder = JsonDecoder::<Percent>::new();
        let err = decoder.decode(br#"{"value": 101}"#).unwrap_err();
        assert_eq!(err, DecodeError::OutOfRange("value = 101".into()));
    }
}
