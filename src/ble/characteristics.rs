//! GATT service and characteristic lookup.
//!
//! Lookups are linear scans by exact UUID; the first match in the order the
//! stack reported wins.

use uuid::Uuid;

use crate::ble::provider::{GattCharacteristic, GattService};

/// Find the first service with the given UUID.
pub fn find_service<'a>(services: &'a [GattService], uuid: &Uuid) -> Option<&'a GattService> {
    services.iter().find(|s| s.uuid == *uuid)
}

/// Find the first characteristic of `service` with the given UUID.
pub fn find_characteristic<'a>(
    service: &'a GattService,
    uuid: &Uuid,
) -> Option<&'a GattCharacteristic> {
    service.characteristics().iter().find(|c| c.uuid == *uuid)
}

/// The value and config characteristics of the sensor service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorCharacteristics {
    /// Characteristic holding the reading.
    pub value: Option<GattCharacteristic>,
    /// Characteristic holding the sensor configuration.
    pub config: Option<GattCharacteristic>,
    missing: Vec<Uuid>,
}

impl SensorCharacteristics {
    /// Resolve both characteristics on `service`.
    pub fn resolve(service: &GattService, value_uuid: &Uuid, config_uuid: &Uuid) -> Self {
        let value = find_characteristic(service, value_uuid).cloned();
        let config = find_characteristic(service, config_uuid).cloned();

        let mut missing = Vec::new();
        if value.is_none() {
            missing.push(*value_uuid);
        }
        if config.is_none() {
            missing.push(*config_uuid);
        }

        Self {
            value,
            config,
            missing,
        }
    }

    /// Whether both characteristics were found.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// UUIDs that could not be found, value first.
    pub fn missing(&self) -> &[Uuid] {
        &self.missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::*;
    use pretty_assertions::assert_eq;

    fn sensor_service(characteristics: &[Uuid]) -> GattService {
        GattService::new(SENSOR_SERVICE_UUID, characteristics.iter().copied())
    }

    #[test]
    fn test_find_service() {
        let other = GattService::new(Uuid::from_u128(0x180a), Vec::new());
        let services = vec![other.clone(), sensor_service(&[])];

        assert_eq!(
            find_service(&services, &SENSOR_SERVICE_UUID).map(|s| s.uuid),
            Some(SENSOR_SERVICE_UUID)
        );
        assert!(find_service(&[other], &SENSOR_SERVICE_UUID).is_none());
        assert!(find_service(&[], &SENSOR_SERVICE_UUID).is_none());
    }

    #[test]
    fn test_resolve_complete() {
        let service = sensor_service(&[SENSOR_CONFIG_UUID, SENSOR_VALUE_UUID]);
        let chars =
            SensorCharacteristics::resolve(&service, &SENSOR_VALUE_UUID, &SENSOR_CONFIG_UUID);

        assert!(chars.is_complete());
        assert_eq!(
            chars.value,
            Some(GattCharacteristic::new(SENSOR_VALUE_UUID, SENSOR_SERVICE_UUID))
        );
        assert_eq!(
            chars.config,
            Some(GattCharacteristic::new(SENSOR_CONFIG_UUID, SENSOR_SERVICE_UUID))
        );
    }

    #[test]
    fn test_resolve_reports_missing() {
        let service = sensor_service(&[SENSOR_VALUE_UUID]);
        let chars =
            SensorCharacteristics::resolve(&service, &SENSOR_VALUE_UUID, &SENSOR_CONFIG_UUID);

        assert!(!chars.is_complete());
        assert!(chars.value.is_some());
        assert_eq!(chars.missing(), &[SENSOR_CONFIG_UUID]);

        let chars = SensorCharacteristics::resolve(
            &sensor_service(&[]),
            &SENSOR_VALUE_UUID,
            &SENSOR_CONFIG_UUID,
        );
        assert_eq!(chars.missing(), &[SENSOR_VALUE_UUID, SENSOR_CONFIG_UUID]);
    }
}
