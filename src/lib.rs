// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # intech-ble-poller
//!
//! Polls an Intech BLE sensor over Bluetooth Low Energy: find it by address
//! or name, connect, read the value characteristic, report the decoded
//! reading, disconnect, and repeat until interrupted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use intech_ble_poller::ble::BleScanner;
//! use intech_ble_poller::{Poller, PollerConfig, Result, ShutdownFlag, TargetDescriptor};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let provider = BleScanner::new().await?;
//!     let target = TargetDescriptor::address("AA:BB:CC:DD:EE:FF")?;
//!
//!     let shutdown = ShutdownFlag::new();
//!     shutdown.listen_for_ctrl_c();
//!
//!     let poller = Poller::new(provider, PollerConfig::new(target), shutdown);
//!     let stats = poller.run().await;
//!     println!("{} readings", stats.readings);
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without hardware
//!
//! [`ble::SimulatedProvider`] implements the same provider interface from a
//! script of discovery rounds and device behaviours.
//!
//! ## Platform Notes
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### macOS
//! Peripheral addresses are not exposed by CoreBluetooth, so match by name.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

pub mod ble;
pub mod config;
pub mod error;
pub mod poller;
pub mod reading;
pub mod shutdown;

pub use ble::uuids::DEFAULT_DEVICE_NAME;
pub use config::{PollerConfig, TargetDescriptor};
pub use error::{Error, Result};
pub use poller::{IterationOutcome, Poller, PollerStats};
pub use reading::{decode_reading, Reading};
pub use shutdown::ShutdownFlag;
