//! Sensor readings.
//!
//! The value characteristic carries an unsigned 16-bit little-endian integer.
//! No scaling is applied; the number is reported as-is.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Minimum payload length for a reading.
pub const READING_SIZE: usize = 2;

/// Decode the first two bytes of `bytes` as a little-endian `u16`.
///
/// Bytes after the second are ignored. Returns `None` for payloads shorter
/// than [`READING_SIZE`].
///
/// # Example
///
/// ```
/// use intech_ble_poller::decode_reading;
///
/// assert_eq!(decode_reading(&[0x10, 0x02]), Some(528));
/// assert_eq!(decode_reading(&[0x10]), None);
/// ```
pub fn decode_reading(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [low, high, ..] => Some(u16::from(*low) | (u16::from(*high) << 8)),
        _ => None,
    }
}

/// One decoded value read from the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// The decoded value.
    pub value: u16,
    /// When the payload was received.
    pub received_at: DateTime<Utc>,
}

impl Reading {
    /// Create a reading stamped with the current time.
    pub fn new(value: u16) -> Self {
        Self {
            value,
            received_at: Utc::now(),
        }
    }

    /// Decode a reading from a raw characteristic payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if the payload is shorter than
    /// [`READING_SIZE`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        decode_reading(bytes)
            .map(Self::new)
            .ok_or_else(|| Error::InvalidData {
                context: format!(
                    "expected at least {} bytes, got {}",
                    READING_SIZE,
                    bytes.len()
                ),
            })
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Heart beat: {}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_known_payload() {
        assert_eq!(decode_reading(&[0x10, 0x02]), Some(528));
        assert_eq!(decode_reading(&[0xFF, 0xFF]), Some(u16::MAX));
        assert_eq!(decode_reading(&[0x00, 0x80]), Some(0x8000));
    }

    #[test]
    fn test_decode_short_payload() {
        assert_eq!(decode_reading(&[]), None);
        assert_eq!(decode_reading(&[0x10]), None);
    }

    #[test]
    fn test_parse() {
        let reading = Reading::parse(&[0x10, 0x02, 0xAA]).unwrap();
        assert_eq!(reading.value, 528);
        assert_eq!(reading.to_string(), "Heart beat: 528");

        let err = Reading::parse(&[0x10]).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
    }

    proptest! {
        #[test]
        fn decode_uses_first_two_bytes(
            low in any::<u8>(),
            high in any::<u8>(),
            rest in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            let mut bytes = vec![low, high];
            bytes.extend(rest);

            prop_assert_eq!(
                decode_reading(&bytes).map(u32::from),
                Some(u32::from(low) + u32::from(high) * 256)
            );
        }
    }
}
