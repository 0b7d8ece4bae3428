//! Scripted in-memory BLE provider.
//!
//! [`SimulatedProvider`] replays a fixed sequence of discovery rounds and
//! hands out [`SimulatedDevice`]s whose behaviour (services, payload,
//! failures) is set up front. Clones of a device share their state and call
//! counters, so a test can keep one copy and inspect what the poller did with
//! the others.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

use crate::ble::provider::{BleDevice, BleProvider, DeviceInfo, GattCharacteristic, GattService};
use crate::ble::uuids::*;
use crate::error::{Error, Result};

/// Number of calls a [`SimulatedDevice`] has received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounts {
    /// `connect` calls.
    pub connects: u32,
    /// `disconnect` calls.
    pub disconnects: u32,
    /// `list_services` calls.
    pub service_queries: u32,
    /// `read_value` calls.
    pub reads: u32,
}

#[derive(Debug, Default)]
struct DeviceState {
    connected: bool,
    calls: CallCounts,
}

/// A scripted peripheral.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    info: DeviceInfo,
    services: Vec<GattService>,
    payload: Vec<u8>,
    fail_connect: bool,
    fail_disconnect: bool,
    fail_read: bool,
    state: Arc<Mutex<DeviceState>>,
}

impl SimulatedDevice {
    /// Payload served by [`SimulatedDevice::sensor`] until overridden.
    pub const DEFAULT_PAYLOAD: [u8; 2] = [0x48, 0x00];

    /// A peripheral with no name, no services and an empty payload.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            info: DeviceInfo::new(address, None),
            services: Vec::new(),
            payload: Vec::new(),
            fail_connect: false,
            fail_disconnect: false,
            fail_read: false,
            state: Arc::new(Mutex::new(DeviceState::default())),
        }
    }

    /// A well-behaved Intech sensor advertising [`DEFAULT_DEVICE_NAME`].
    pub fn sensor(address: impl Into<String>) -> Self {
        Self::new(address)
            .with_name(DEFAULT_DEVICE_NAME)
            .with_rssi(-60)
            .with_services(vec![GattService::new(
                SENSOR_SERVICE_UUID,
                [SENSOR_CONFIG_UUID, SENSOR_VALUE_UUID],
            )])
            .with_payload(Self::DEFAULT_PAYLOAD.to_vec())
    }

    /// Set the advertised name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.info.name = Some(name.into());
        self
    }

    /// Set the reported signal strength.
    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.info.rssi = Some(rssi);
        self
    }

    /// Replace the services exposed after connecting.
    pub fn with_services(mut self, services: Vec<GattService>) -> Self {
        self.services = services;
        self
    }

    /// Replace the bytes returned by every read.
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Make every `connect` fail.
    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Make every `disconnect` fail.
    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    /// Make every `read_value` fail.
    pub fn failing_read(mut self) -> Self {
        self.fail_read = true;
        self
    }

    /// Calls received so far, across all clones of this device.
    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }
}

#[async_trait]
impl BleDevice for SimulatedDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.connects += 1;

        if self.fail_connect {
            return Err(Error::ConnectionFailed {
                reason: "simulated connect failure".to_string(),
            });
        }

        state.connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.disconnects += 1;

        if self.fail_disconnect {
            return Err(Error::DisconnectFailed {
                reason: "simulated disconnect failure".to_string(),
            });
        }

        state.connected = false;
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool> {
        Ok(self.state.lock().connected)
    }

    async fn list_services(&self) -> Result<Vec<GattService>> {
        let mut state = self.state.lock();
        state.calls.service_queries += 1;

        if !state.connected {
            return Err(Error::Internal(format!(
                "{} is not connected",
                self.info.address
            )));
        }

        Ok(self.services.clone())
    }

    async fn read_value(&self, characteristic: &GattCharacteristic) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        state.calls.reads += 1;

        if self.fail_read {
            return Err(Error::ReadFailed {
                reason: "simulated read failure".to_string(),
            });
        }

        let known = self
            .services
            .iter()
            .flat_map(|s| s.characteristics())
            .any(|c| c == characteristic);
        if !known {
            return Err(Error::CharacteristicNotFound {
                uuid: characteristic.uuid.to_string(),
            });
        }

        trace!(
            "Simulated read of {} bytes from {}",
            self.payload.len(),
            characteristic.uuid
        );
        Ok(self.payload.clone())
    }
}

#[derive(Debug, Default)]
struct ProviderState {
    discovery_started: bool,
    polls: usize,
}

/// A provider that replays scripted discovery rounds.
///
/// The n-th `list_devices` call returns the n-th round; once the script runs
/// out the last round repeats. An empty script never finds anything.
#[derive(Debug, Default)]
pub struct SimulatedProvider {
    rounds: Vec<Vec<SimulatedDevice>>,
    state: Mutex<ProviderState>,
}

impl SimulatedProvider {
    /// Create a provider from explicit discovery rounds.
    pub fn new(rounds: Vec<Vec<SimulatedDevice>>) -> Self {
        Self {
            rounds,
            state: Mutex::new(ProviderState::default()),
        }
    }

    /// A provider that always lists the same single device.
    pub fn with_device(device: SimulatedDevice) -> Self {
        Self::new(vec![vec![device]])
    }

    /// Number of `list_devices` calls so far.
    pub fn polls(&self) -> usize {
        self.state.lock().polls
    }

    /// Whether `start_discovery` has been called.
    pub fn discovery_started(&self) -> bool {
        self.state.lock().discovery_started
    }
}

#[async_trait]
impl BleProvider for SimulatedProvider {
    type Device = SimulatedDevice;

    async fn start_discovery(&self) -> Result<bool> {
        self.state.lock().discovery_started = true;
        Ok(true)
    }

    async fn list_devices(&self) -> Result<Vec<SimulatedDevice>> {
        let mut state = self.state.lock();
        let round = state.polls.min(self.rounds.len().saturating_sub(1));
        state.polls += 1;

        Ok(self.rounds.get(round).cloned().unwrap_or_default())
    }
}
