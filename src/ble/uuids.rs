//! BLE Service and Characteristic UUIDs.
//!
//! Contains the UUID constants and default names used to find an Intech BLE
//! sensor.

use uuid::Uuid;

// Intech sensor service (vendor specific)
/// Service exposing the sensor's value and config characteristics.
pub const SENSOR_SERVICE_UUID: Uuid = Uuid::from_u128(0x7788_0001_b5a3_f393_e0a9_150e24fcca8e);
/// Config characteristic UUID (Read, Write).
pub const SENSOR_CONFIG_UUID: Uuid = Uuid::from_u128(0x7788_0002_b5a3_f393_e0a9_150e24fcca8e);
/// Value characteristic UUID (Read). Holds a little-endian 16-bit reading.
pub const SENSOR_VALUE_UUID: Uuid = Uuid::from_u128(0x7788_0003_b5a3_f393_e0a9_150e24fcca8e);

/// Advertised local name of the sensor, used when no address is given.
pub const DEFAULT_DEVICE_NAME: &str = "Intech_BLE";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            SENSOR_SERVICE_UUID.to_string(),
            "77880001-b5a3-f393-e0a9-150e24fcca8e"
        );
        assert_eq!(
            SENSOR_CONFIG_UUID.to_string(),
            "77880002-b5a3-f393-e0a9-150e24fcca8e"
        );
        assert_eq!(
            SENSOR_VALUE_UUID.to_string(),
            "77880003-b5a3-f393-e0a9-150e24fcca8e"
        );
    }
}
