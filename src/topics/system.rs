//! `system` topic: board identity and switch bank
//!
//! Written locally in a fixed binary layout:
//!
//! ```text
//!   0                  16   17
//!   ┌───────────────────┬────┐
//!   │ id (NUL padded)   │ sw │
//!   └───────────────────┴────┘
//! ```
//!
//! Bit `n` of `sw` is switch `n`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::pipeline::Decoder;
use crate::snapshot::Record;

/// Bytes reserved for the id
pub const ID_LEN: usize = 16;

/// Encoded size of a [`SystemConfig`]
pub const ENCODED_LEN: usize = ID_LEN + 1;

/// Number of switches
pub const SWITCH_COUNT: usize = 8;

/// Decoded system configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemConfig {
    /// Board id, at most [`ID_LEN`] bytes
    pub id: String,
    /// Switch positions, index 0 = switch 0
    pub switches: [bool; SWITCH_COUNT],
}

impl SystemConfig {
    /// Build a configuration
    ///
    /// Ids longer than [`ID_LEN`] bytes are cut at a character boundary.
    pub fn new(id: &str, switches: [bool; SWITCH_COUNT]) -> Self {
        Self {
            id: fit_id(id).to_string(),
            switches,
        }
    }

    /// Switch positions packed into a byte
    pub fn switch_bits(&self) -> u8 {
        self.switches
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }

    /// Encode into the topic's wire layout
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENCODED_LEN);
        let id = fit_id(&self.id).as_bytes();

        buf.put_slice(id);
        buf.put_bytes(0, ID_LEN - id.len());
        buf.put_u8(self.switch_bits());
        buf.freeze()
    }

    /// Decode from the topic's wire layout
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        if raw.len() != ENCODED_LEN {
            return Err(DecodeError::malformed(format!(
                "expected {} bytes, got {}",
                ENCODED_LEN,
                raw.len()
            )));
        }

        let id_bytes = &raw[..ID_LEN];
        let end = id_bytes.iter().position(|b| *b == 0).unwrap_or(ID_LEN);
        let id = std::str::from_utf8(&id_bytes[..end])
            .map_err(|_| DecodeError::malformed("id is not valid UTF-8"))?;

        let bits = raw[ID_LEN];
        let mut switches = [false; SWITCH_COUNT];
        for (i, switch) in switches.iter_mut().enumerate() {
            *switch = bits & (1 << i) != 0;
        }

        Ok(SystemConfig {
            id: id.to_string(),
            switches,
        })
    }
}

/// Longest prefix of `id` that fits in [`ID_LEN`] bytes without splitting a character
fn fit_id(id: &str) -> &str {
    let mut end = id.len().min(ID_LEN);
    while !id.is_char_boundary(end) {
        end -= 1;
    }
    &id[..end]
}

/// Decoder for the `system` topic
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDecoder;

impl Decoder for SystemDecoder {
    fn name(&self) -> &'static str {
        "system"
    }

    fn decode(&self, raw: &[u8]) -> Result<Record, DecodeError> {
        SystemConfig::decode(raw).map(Record::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let mut switches = [false; SWITCH_COUNT];
        switches[0] = true;
        switches[7] = true;
        let encoded = SystemConfig::new("Sonata-1", switches).encode();

        assert_eq!(encoded.len(), ENCODED_LEN);
        assert_eq!(&encoded[..8], b"Sonata-1");
        assert!(encoded[8..ID_LEN].iter().all(|b| *b == 0));
        assert_eq!(encoded[ID_LEN], 0b1000_0001);

        let decoded = SystemConfig::decode(&encoded).unwrap();
        assert_eq!(decoded.id, "Sonata-1");
        assert_eq!(decoded.switches, switches);
    }

    #[test]
    fn test_full_length_id() {
        let config = SystemConfig::new("abcdefghijklmnopqrst", [false; SWITCH_COUNT]);
        assert_eq!(config.id, "abcdefghijklmnop");

        let decoded = SystemConfig::decode(&config.encode()).unwrap();
        assert_eq!(decoded.id, "abcdefghijklmnop");
    }

    #[test]
    fn test_multibyte_id_set_directly() {
        // 15 ASCII bytes then a 2-byte character straddling the limit
        let config = SystemConfig {
            id: "abcdefghijklmnoé".to_string(),
            switches: [false; SWITCH_COUNT],
        };

        let encoded = config.encode();
        assert_eq!(encoded.len(), ENCODED_LEN);
        assert_eq!(encoded[15], 0);

        let decoded = SystemConfig::decode(&encoded).unwrap();
        assert_eq!(decoded.id, "abcdefghijklmno");
    }

    #[test]
    fn test_wrong_length() {
        let err = SystemConfig::decode(&[0u8; 4]).unwrap_err();
        assert_eq!(err, DecodeError::Malformed("expected 17 bytes, got 4".into()));
    }

    #[test]
    fn test_invalid_utf8_id() {
        let mut raw = [0u8; ENCODED_LEN];
        raw[0] = 0xff;
        raw[1] = 0xfe;

        let err = SystemDecoder.decode(&raw).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_decoder_record() {
        let raw = SystemConfig::new("Sonata-0", [true; SWITCH_COUNT]).encode();
        let record = SystemDecoder.decode(&raw).unwrap();

        let config = record.downcast_ref::<SystemConfig>().unwrap();
        assert_eq!(config.switch_bits(), 0xff);
    }
}
