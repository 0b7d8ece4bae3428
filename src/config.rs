//! Poller configuration.
//!
//! Holds the target descriptor, the GATT UUIDs to look for and the fixed
//! intervals of the polling loop.

use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::ble::provider::{BleDevice, DeviceInfo};
use crate::ble::uuids::*;
use crate::error::{Error, Result};

/// Default delay between discovery polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default delay after a failed connect or service lookup.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Default delay after a completed connect/read/disconnect cycle.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);

/// Which peripheral to poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetDescriptor {
    /// Match by Bluetooth address (upper case, colon separated).
    Address(String),
    /// Match by advertised local name.
    Name(String),
}

impl TargetDescriptor {
    /// Target a device by address.
    ///
    /// Accepts six colon-separated hex octets in either case and normalises
    /// them to upper case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `address` is not a MAC address.
    ///
    /// # Example
    ///
    /// ```
    /// use intech_ble_poller::TargetDescriptor;
    ///
    /// let target = TargetDescriptor::address("aa:bb:cc:dd:ee:ff").unwrap();
    /// assert_eq!(target, TargetDescriptor::Address("AA:BB:CC:DD:EE:FF".into()));
    /// assert!(TargetDescriptor::address("not-a-mac").is_err());
    /// ```
    pub fn address(address: &str) -> Result<Self> {
        let octets: Vec<_> = address.split(':').collect();
        let valid = octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));

        if !valid {
            return Err(Error::InvalidParameter {
                name: "address".to_string(),
                value: address.to_string(),
            });
        }

        Ok(Self::Address(address.to_ascii_uppercase()))
    }

    /// Target a device by advertised name.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Whether `info` describes the target. Comparison is exact.
    pub fn matches(&self, info: &DeviceInfo) -> bool {
        match self {
            Self::Address(address) => info.address == *address,
            Self::Name(name) => info.name.as_deref() == Some(name.as_str()),
        }
    }

    /// Pick the first device, in list order, that matches the target.
    pub fn select<D: BleDevice>(&self, devices: impl IntoIterator<Item = D>) -> Option<D> {
        devices.into_iter().find(|d| self.matches(d.info()))
    }
}

impl Default for TargetDescriptor {
    fn default() -> Self {
        Self::Name(DEFAULT_DEVICE_NAME.to_string())
    }
}

impl FromStr for TargetDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::address(s)
    }
}

impl std::fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(address) => write!(f, "device at {}", address),
            Self::Name(name) => write!(f, "device named {}", name),
        }
    }
}

/// Configuration for a [`Poller`](crate::Poller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Device to poll.
    pub target: TargetDescriptor,
    /// Service holding the sensor characteristics.
    pub service_uuid: Uuid,
    /// Characteristic to read.
    pub value_uuid: Uuid,
    /// Characteristic expected next to the value one.
    pub config_uuid: Uuid,
    /// Delay between discovery polls.
    pub poll_interval: Duration,
    /// Delay after a failed connect, a failed service lookup or missing
    /// characteristics.
    pub retry_backoff: Duration,
    /// Delay after each completed cycle.
    pub cooldown: Duration,
}

impl PollerConfig {
    /// Default configuration for the given target.
    pub fn new(target: TargetDescriptor) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Set the discovery poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the retry back-off.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the cool-down between cycles.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            target: TargetDescriptor::default(),
            service_uuid: SENSOR_SERVICE_UUID,
            value_uuid: SENSOR_VALUE_UUID,
            config_uuid: SENSOR_CONFIG_UUID,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}
