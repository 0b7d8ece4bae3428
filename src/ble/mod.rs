//! BLE communication module.
//!
//! This module provides the provider abstraction the poller runs against,
//! its btleplug and simulated implementations, and GATT lookup helpers.

pub mod characteristics;
pub mod connection;
pub mod provider;
pub mod scanner;
pub mod simulated;
pub mod uuids;

pub use characteristics::SensorCharacteristics;
pub use connection::{Connection, ConnectionState};
pub use provider::{BleDevice, BleProvider, DeviceInfo, GattCharacteristic, GattService};
pub use scanner::{BleScanner, PeripheralDevice};
pub use simulated::{CallCounts, SimulatedDevice, SimulatedProvider};
pub use uuids::*;
