//! BLE provider abstraction.
//!
//! The poller never talks to a Bluetooth stack directly. It drives a
//! [`BleProvider`], which hands out [`BleDevice`] handles for the peripherals
//! it currently knows about. [`BleScanner`](crate::ble::BleScanner) backs this
//! with btleplug; [`SimulatedProvider`](crate::ble::SimulatedProvider) is a
//! scripted in-memory stand-in.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// Snapshot of a discovered peripheral's attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceInfo {
    /// Bluetooth address, upper case, colon separated.
    pub address: String,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

impl DeviceInfo {
    /// Create a new device info with just an address and name.
    pub fn new(address: impl Into<String>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name,
            rssi: None,
        }
    }

    /// Name to show in logs, falling back to `(unknown)`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unknown)")
    }
}

/// A GATT characteristic found on a connected device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GattCharacteristic {
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// UUID of the service that owns this characteristic.
    pub service_uuid: Uuid,
}

impl GattCharacteristic {
    /// Create a characteristic handle.
    pub fn new(uuid: Uuid, service_uuid: Uuid) -> Self {
        Self { uuid, service_uuid }
    }
}

/// A GATT service found on a connected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    /// Service UUID.
    pub uuid: Uuid,
    characteristics: Vec<GattCharacteristic>,
}

impl GattService {
    /// Create a service with the given characteristic UUIDs.
    pub fn new(uuid: Uuid, characteristic_uuids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            uuid,
            characteristics: characteristic_uuids
                .into_iter()
                .map(|c| GattCharacteristic::new(c, uuid))
                .collect(),
        }
    }

    /// Characteristics of this service, in the order the stack reported them.
    pub fn characteristics(&self) -> &[GattCharacteristic] {
        &self.characteristics
    }
}

/// Source of discoverable BLE peripherals.
///
/// Construction of an implementation is the fallible "init" step; a provider
/// that exists is assumed usable.
#[async_trait]
pub trait BleProvider: Send + Sync {
    /// Device handle type handed out by this provider.
    type Device: BleDevice;

    /// Begin scanning. Returns whether the stack accepted the request.
    async fn start_discovery(&self) -> Result<bool>;

    /// Devices currently known to the stack, in the stack's order.
    async fn list_devices(&self) -> Result<Vec<Self::Device>>;
}

/// Handle to a single peripheral.
#[async_trait]
pub trait BleDevice: Send + Sync {
    /// Attributes captured when the device was listed.
    fn info(&self) -> &DeviceInfo;

    /// Establish a connection.
    async fn connect(&self) -> Result<()>;

    /// Tear the connection down.
    async fn disconnect(&self) -> Result<()>;

    /// Query the live connection state.
    async fn is_connected(&self) -> Result<bool>;

    /// Enumerate the services of a connected device.
    async fn list_services(&self) -> Result<Vec<GattService>>;

    /// Read the current value of a characteristic.
    async fn read_value(&self, characteristic: &GattCharacteristic) -> Result<Vec<u8>>;
}
