//! BLE connection management.
//!
//! A [`Connection`] borrows a device handle for the duration of one
//! connect/read/disconnect cycle. It is consumed by [`Connection::close`], so
//! nothing obtained through it can be used after the link is torn down.

use tracing::{debug, info, warn};

use crate::ble::provider::BleDevice;
use crate::error::{Error, Result};

/// Connection state for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected to the device.
    #[default]
    Disconnected,
    /// Currently attempting to connect.
    Connecting,
    /// Connected to the device.
    Connected,
    /// Currently disconnecting.
    Disconnecting,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// An open connection to a device.
pub struct Connection<'a, D: BleDevice> {
    device: &'a D,
    state: ConnectionState,
}

impl<'a, D: BleDevice> Connection<'a, D> {
    /// Connect to `device`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the stack refuses the connection.
    pub async fn open(device: &'a D) -> Result<Self> {
        let mut connection = Self {
            device,
            state: ConnectionState::Disconnected,
        };
        connection.set_state(ConnectionState::Connecting);

        match device.connect().await {
            Ok(()) => {
                connection.set_state(ConnectionState::Connected);
                info!("Connected to {}", device.info().address);
                Ok(connection)
            }
            Err(e) => {
                connection.set_state(ConnectionState::Disconnected);
                Err(Error::ConnectionFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// The connected device.
    pub fn device(&self) -> &D {
        self.device
    }

    /// Disconnect from the device.
    ///
    /// The connection is considered closed afterwards even if the stack
    /// reported an error.
    pub async fn close(mut self) -> Result<()> {
        self.set_state(ConnectionState::Disconnecting);
        let result = self.device.disconnect().await;
        self.set_state(ConnectionState::Disconnected);

        match result {
            Ok(()) => {
                info!("Disconnected from {}", self.device.info().address);
                Ok(())
            }
            Err(e) => Err(Error::DisconnectFailed {
                reason: e.to_string(),
            }),
        }
    }

    fn set_state(&mut self, new_state: ConnectionState) {
        if self.state != new_state {
            debug!(
                "Connection state changed: {} -> {} ({})",
                self.state,
                new_state,
                self.device.info().address
            );
            self.state = new_state;
        }
    }
}

impl<D: BleDevice> Drop for Connection<'_, D> {
    fn drop(&mut self) {
        if self.state.is_connected() {
            warn!(
                "Connection to {} dropped without disconnecting",
                self.device.info().address
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::simulated::SimulatedDevice;

    #[test]
    fn test_connection_state() {
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Disconnecting.is_connected());
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(format!("{}", ConnectionState::Connected), "Connected");
        assert_eq!(format!("{}", ConnectionState::Disconnected), "Disconnected");
    }

    #[tokio::test]
    async fn test_open_and_close() {
        let device = SimulatedDevice::sensor("AA:BB:CC:DD:EE:FF");

        let connection = Connection::open(&device).await.unwrap();
        assert_eq!(connection.state, ConnectionState::Connected);
        assert!(device.is_connected().await.unwrap());

        connection.close().await.unwrap();
        assert!(!device.is_connected().await.unwrap());
        assert_eq!(device.calls().disconnects, 1);
    }

    #[tokio::test]
    async fn test_open_failure_maps_to_connection_failed() {
        let device = SimulatedDevice::sensor("AA:BB:CC:DD:EE:FF").failing_connect();

        let err = Connection::open(&device).await.err().unwrap();
        assert!(matches!(err, Error::ConnectionFailed { .. }));
        assert!(!device.is_connected().await.unwrap());
        assert_eq!(device.calls().connects, 1);
    }

    #[tokio::test]
    async fn test_set_state_tracks_transitions() {
        let device = SimulatedDevice::sensor("AA:BB:CC:DD:EE:FF");
        let mut connection = Connection {
            device: &device,
            state: ConnectionState::Disconnected,
        };

        connection.set_state(ConnectionState::Connecting);
        assert_eq!(connection.state, ConnectionState::Connecting);
        connection.set_state(ConnectionState::Disconnected);
        assert_eq!(connection.state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_close_failure_maps_to_disconnect_failed() {
        let device = SimulatedDevice::sensor("AA:BB:CC:DD:EE:FF").failing_disconnect();

        let connection = Connection::open(&device).await.unwrap();
        let err = connection.close().await.unwrap_err();
        assert!(matches!(err, Error::DisconnectFailed { .. }));
    }
}
