//! The polling loop.
//!
//! Finds the target device, connects, reads one value, disconnects, sleeps,
//! and starts over until shutdown is requested. Every failure after
//! construction is logged and turned into a retry; nothing but the shutdown
//! flag ends the loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::ble::characteristics::{find_service, SensorCharacteristics};
use crate::ble::connection::Connection;
use crate::ble::provider::{BleDevice, BleProvider};
use crate::config::PollerConfig;
use crate::error::Error;
use crate::reading::Reading;
use crate::shutdown::ShutdownFlag;

/// Result of one connect/read/disconnect cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// A value was read and decoded.
    Read(Reading),
    /// The device refused the connection.
    ConnectFailed,
    /// The device exposed no services.
    NoServices,
    /// The sensor service was not among the device's services.
    ServiceNotFound,
    /// The service had no value characteristic to read.
    ValueCharacteristicMissing,
    /// The read succeeded but returned too few bytes.
    ShortPayload,
    /// The read itself failed.
    ReadFailed,
}

impl IterationOutcome {
    /// Check if a reading was produced.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Read(_))
    }

    /// The reading, if one was produced.
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Read(reading) => Some(reading),
            _ => None,
        }
    }

    /// Whether the next cycle should wait the retry back-off rather than the
    /// cool-down.
    fn needs_backoff(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed | Self::NoServices | Self::ServiceNotFound
        )
    }
}

/// Counters kept by a [`Poller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollerStats {
    /// Cycles started (one per matched device).
    pub iterations: u64,
    /// Cycles that produced a reading.
    pub readings: u64,
    /// Cycles that did not.
    pub failures: u64,
}

/// Polls one BLE sensor through a [`BleProvider`].
pub struct Poller<P: BleProvider> {
    /// Source of devices.
    provider: P,
    /// Target, UUIDs and intervals.
    config: PollerConfig,
    /// Checked between steps.
    shutdown: ShutdownFlag,
    /// Reading channel.
    reading_tx: broadcast::Sender<Reading>,
    iterations: AtomicU64,
    readings: AtomicU64,
    failures: AtomicU64,
}

impl<P: BleProvider> Poller<P> {
    /// Create a poller. Nothing happens until [`Poller::run`] is awaited.
    pub fn new(provider: P, config: PollerConfig, shutdown: ShutdownFlag) -> Self {
        let (reading_tx, _) = broadcast::channel(16);

        Self {
            provider,
            config,
            shutdown,
            reading_tx,
            iterations: AtomicU64::new(0),
            readings: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Get the provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Get the shutdown flag.
    pub fn shutdown_flag(&self) -> &ShutdownFlag {
        &self.shutdown
    }

    /// Subscribe to decoded readings.
    pub fn subscribe_readings(&self) -> broadcast::Receiver<Reading> {
        self.reading_tx.subscribe()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> PollerStats {
        PollerStats {
            iterations: self.iterations.load(Ordering::SeqCst),
            readings: self.readings.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
        }
    }

    /// Ask the provider to start scanning. Failures are logged and reported
    /// as `false`.
    pub async fn start_discovery(&self) -> bool {
        let started = match self.provider.start_discovery().await {
            Ok(started) => started,
            Err(e) => {
                warn!("Failed to start discovery: {}", e);
                false
            }
        };

        info!("Started = {}", started);
        started
    }

    /// Run until shutdown is requested, then return the final counters.
    pub async fn run(&self) -> PollerStats {
        self.start_discovery().await;

        while !self.shutdown.is_requested() {
            let Some(device) = self.wait_for_target().await else {
                break;
            };

            let outcome = self.poll_device(&device).await;
            drop(device);

            let pause = if outcome.needs_backoff() {
                self.config.retry_backoff
            } else {
                self.config.cooldown
            };
            self.pause(pause).await;
        }

        info!("Polling stopped");
        self.stats()
    }

    /// Poll the provider until the target shows up.
    ///
    /// Returns `None` once shutdown is requested; the flag is checked before
    /// every poll.
    pub async fn wait_for_target(&self) -> Option<P::Device> {
        info!("Discovering {} ....", self.config.target);

        let mut polls: u64 = 0;
        loop {
            if self.shutdown.is_requested() {
                debug!("Shutdown requested during discovery after {} polls", polls);
                return None;
            }

            polls += 1;
            let devices = match self.provider.list_devices().await {
                Ok(devices) => devices,
                Err(e) => {
                    warn!("Failed to list devices: {}", e);
                    Vec::new()
                }
            };
            trace!("Poll {}: {} devices visible", polls, devices.len());

            if let Some(device) = self.config.target.select(devices) {
                debug!(
                    "Matched {} after {} polls",
                    device.info().address,
                    polls
                );
                return Some(device);
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Run one connect/read/disconnect cycle against `device`.
    ///
    /// Disconnect is always attempted once connected, whatever happened in
    /// between.
    pub async fn poll_device(&self, device: &P::Device) -> IterationOutcome {
        self.iterations.fetch_add(1, Ordering::SeqCst);

        let connection = match Connection::open(device).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Error: {}", e);
                return self.record(IterationOutcome::ConnectFailed);
            }
        };

        let info = device.info();
        let connected = device.is_connected().await.unwrap_or(false);
        info!(
            "Found device Name = {} Address = {} Connected = {} RSSI = {}",
            info.display_name(),
            info.address,
            connected,
            info.rssi
                .map(|r| r.to_string())
                .unwrap_or_else(|| "n/a".to_string())
        );

        let outcome = self.read_sensor(&connection).await;

        if let Err(e) = connection.close().await {
            warn!("Error: {}", e);
        }

        self.record(outcome)
    }

    async fn read_sensor(&self, connection: &Connection<'_, P::Device>) -> IterationOutcome {
        let device = connection.device();

        let services = match device.list_services().await {
            Ok(services) => services,
            Err(e) => {
                warn!("Failed to list services: {}", e);
                Vec::new()
            }
        };

        if services.is_empty() {
            warn!("Device {} exposed no services", device.info().address);
            return IterationOutcome::NoServices;
        }

        let Some(service) = find_service(&services, &self.config.service_uuid) else {
            let err = Error::ServiceNotFound {
                uuid: self.config.service_uuid.to_string(),
            };
            warn!("{}", err);
            return IterationOutcome::ServiceNotFound;
        };

        let characteristics = SensorCharacteristics::resolve(
            service,
            &self.config.value_uuid,
            &self.config.config_uuid,
        );

        if !characteristics.is_complete() {
            warn!(
                "Could not find characteristics: {:?}",
                characteristics.missing()
            );
            self.pause(self.config.retry_backoff).await;
        }

        let Some(value) = characteristics.value.as_ref() else {
            return IterationOutcome::ValueCharacteristicMissing;
        };

        match device.read_value(value).await {
            Ok(bytes) => match Reading::parse(&bytes) {
                Ok(reading) => {
                    debug!("{}", reading);
                    let _ = self.reading_tx.send(reading);
                    IterationOutcome::Read(reading)
                }
                Err(e) => {
                    warn!("Error: {}", e);
                    IterationOutcome::ShortPayload
                }
            },
            Err(e) => {
                warn!("Error: {}", e);
                IterationOutcome::ReadFailed
            }
        }
    }

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn record(&self, outcome: IterationOutcome) -> IterationOutcome {
        if outcome.is_success() {
            self.readings.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        outcome
    }
}

impl<P: BleProvider> std::fmt::Debug for Poller<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
