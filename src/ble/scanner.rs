//! BLE scanning functionality.
//!
//! Provides the btleplug-backed [`BleProvider`] used against real hardware.

use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use parking_lot::RwLock;
use tracing::{debug, info, trace};

use crate::ble::provider::{BleDevice, BleProvider, DeviceInfo, GattCharacteristic, GattService};
use crate::error::{Error, Result};

/// BLE scanner over the first Bluetooth adapter of the host.
pub struct BleScanner {
    /// The BLE adapter to use for scanning.
    adapter: Adapter,
    /// Whether scanning is currently active.
    is_scanning: RwLock<bool>,
}

impl BleScanner {
    /// Create a new BLE scanner.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Create a new BLE scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            is_scanning: RwLock::new(false),
        }
    }
}

#[async_trait]
impl BleProvider for BleScanner {
    type Device = PeripheralDevice;

    async fn start_discovery(&self) -> Result<bool> {
        if *self.is_scanning.read() {
            debug!("Already scanning, ignoring start request");
            return Ok(true);
        }

        info!("Starting BLE scan");

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        *self.is_scanning.write() = true;
        Ok(true)
    }

    async fn list_devices(&self) -> Result<Vec<PeripheralDevice>> {
        let peripherals = self.adapter.peripherals().await.map_err(Error::Bluetooth)?;
        let mut devices = Vec::with_capacity(peripherals.len());

        for peripheral in peripherals {
            let properties = match peripheral.properties().await {
                Ok(p) => p,
                Err(e) => {
                    trace!("Failed to get properties for {:?}: {}", peripheral.id(), e);
                    continue;
                }
            };

            let (name, rssi) = properties
                .map(|p| (p.local_name, p.rssi))
                .unwrap_or((None, None));

            let info = DeviceInfo {
                address: peripheral.address().to_string(),
                name,
                rssi,
            };

            devices.push(PeripheralDevice { peripheral, info });
        }

        Ok(devices)
    }
}

/// A btleplug peripheral together with the attributes seen when it was listed.
pub struct PeripheralDevice {
    peripheral: Peripheral,
    info: DeviceInfo,
}

#[async_trait]
impl BleDevice for PeripheralDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    async fn connect(&self) -> Result<()> {
        self.peripheral.connect().await.map_err(Error::Bluetooth)
    }

    async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await.map_err(Error::Bluetooth)
    }

    async fn is_connected(&self) -> Result<bool> {
        self.peripheral.is_connected().await.map_err(Error::Bluetooth)
    }

    async fn list_services(&self) -> Result<Vec<GattService>> {
        self.peripheral
            .discover_services()
            .await
            .map_err(Error::Bluetooth)?;

        let services: Vec<_> = self
            .peripheral
            .services()
            .into_iter()
            .map(|service| {
                debug!(
                    "Found service {} with {} characteristics",
                    service.uuid,
                    service.characteristics.len()
                );
                GattService::new(
                    service.uuid,
                    service.characteristics.into_iter().map(|c| c.uuid),
                )
            })
            .collect();

        Ok(services)
    }

    async fn read_value(&self, characteristic: &GattCharacteristic) -> Result<Vec<u8>> {
        let target = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| {
                c.uuid == characteristic.uuid && c.service_uuid == characteristic.service_uuid
            })
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: characteristic.uuid.to_string(),
            })?;

        let data = self
            .peripheral
            .read(&target)
            .await
            .map_err(Error::Bluetooth)?;

        trace!(
            "Read {} bytes from characteristic {}",
            data.len(),
            characteristic.uuid
        );

        Ok(data)
    }
}

impl std::fmt::Debug for PeripheralDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeripheralDevice")
            .field("info", &self.info)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peripheral_device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PeripheralDevice>();
        assert_send_sync::<BleScanner>();
    }
}
