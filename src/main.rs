//! Command-line poller for the Intech BLE sensor.
//!
//! Run with: cargo run -- [AA:BB:CC:DD:EE:FF]

use clap::Parser;
use intech_ble_poller::ble::{BleProvider, BleScanner, SimulatedDevice, SimulatedProvider};
use intech_ble_poller::{Poller, PollerConfig, ShutdownFlag, TargetDescriptor, DEFAULT_DEVICE_NAME};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Address used for the simulated sensor when none is given.
const SIMULATED_ADDRESS: &str = "00:11:22:33:44:55";

#[derive(Debug, Parser)]
#[command(name = "intech-ble-poller", version, about = "Intech BLE Sensor demo")]
struct Cli {
    /// MAC address of the sensor. When omitted the sensor is matched by name.
    #[arg(value_parser = parse_address)]
    address: Option<TargetDescriptor>,

    /// Advertised name to match when no address is given.
    #[arg(long, default_value = DEFAULT_DEVICE_NAME)]
    name: String,

    /// Delay between discovery polls, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Delay after a failed connect or service lookup, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    retry_backoff_ms: u64,

    /// Delay between cycles, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    cooldown_ms: u64,

    /// Poll a simulated sensor instead of the Bluetooth adapter.
    #[arg(long)]
    simulate: bool,
}

impl Cli {
    fn target(&self) -> TargetDescriptor {
        self.address
            .clone()
            .unwrap_or_else(|| TargetDescriptor::name(self.name.clone()))
    }

    fn config(&self) -> PollerConfig {
        PollerConfig::new(self.target())
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
            .with_cooldown(Duration::from_millis(self.cooldown_ms))
    }

    fn simulated_device(&self) -> SimulatedDevice {
        let address = match &self.address {
            Some(TargetDescriptor::Address(address)) => address.clone(),
            _ => SIMULATED_ADDRESS.to_string(),
        };
        SimulatedDevice::sensor(address).with_name(self.name.clone())
    }
}

fn parse_address(s: &str) -> Result<TargetDescriptor, String> {
    TargetDescriptor::address(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("intech_ble_poller=info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Intech BLE Sensor demo");

    let shutdown = ShutdownFlag::new();
    let _ctrl_c = shutdown.listen_for_ctrl_c();

    if cli.simulate {
        info!("Using simulated sensor");
        let provider = SimulatedProvider::with_device(cli.simulated_device());
        return poll(provider, cli.config(), shutdown).await;
    }

    let provider = match BleScanner::new().await {
        Ok(provider) => provider,
        Err(e) => {
            error!("Error while initializing Bluetooth: {}", e);
            return ExitCode::from(1);
        }
    };

    poll(provider, cli.config(), shutdown).await
}

async fn poll<P: BleProvider>(
    provider: P,
    config: PollerConfig,
    shutdown: ShutdownFlag,
) -> ExitCode {
    let poller = Poller::new(provider, config, shutdown);

    let mut readings = poller.subscribe_readings();
    let printer = tokio::spawn(async move {
        loop {
            match readings.recv().await {
                Ok(reading) => println!("\n{}\n", reading),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let stats = poller.run().await;
    printer.abort();

    info!(
        "Stopped after {} cycles ({} readings, {} failures)",
        stats.iterations, stats.readings, stats.failures
    );

    ExitCode::SUCCESS
}
