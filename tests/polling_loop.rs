//! End-to-end runs of the polling loop against the simulated provider.

use intech_ble_poller::ble::{SimulatedDevice, SimulatedProvider};
use intech_ble_poller::{Poller, PollerConfig, ShutdownFlag, TargetDescriptor};
use std::time::{Duration, Instant};

const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

fn config(poll_interval: Duration) -> PollerConfig {
    PollerConfig::new(TargetDescriptor::address(ADDRESS).unwrap())
        .with_poll_interval(poll_interval)
        .with_retry_backoff(Duration::from_millis(5))
        .with_cooldown(Duration::from_millis(5))
}

/// Wait until `condition` holds, failing the test after five seconds.
async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn target_found_on_third_poll_then_connected() {
    let target = SimulatedDevice::sensor(ADDRESS);
    let stranger = SimulatedDevice::sensor("11:22:33:44:55:66");
    let provider = SimulatedProvider::new(vec![
        vec![],
        vec![stranger.clone()],
        vec![stranger.clone(), target.clone()],
    ]);
    let poller = Poller::new(
        provider,
        config(Duration::from_millis(5)),
        ShutdownFlag::new(),
    );

    let device = poller.wait_for_target().await.unwrap();
    assert_eq!(poller.provider().polls(), 3);

    let outcome = poller.poll_device(&device).await;
    assert!(outcome.is_success());
    assert_eq!(target.calls().connects, 1);
    assert_eq!(stranger.calls().connects, 0);
}

#[tokio::test]
async fn run_reports_decoded_reading_and_stops_on_shutdown() {
    let device = SimulatedDevice::sensor(ADDRESS).with_payload(vec![0x10, 0x02]);
    let shutdown = ShutdownFlag::new();
    let poller = Poller::new(
        SimulatedProvider::with_device(device.clone()),
        config(Duration::from_millis(5)),
        shutdown.clone(),
    );
    let mut readings = poller.subscribe_readings();

    let (stats, reading) = tokio::join!(poller.run(), async {
        let reading = readings.recv().await.unwrap();
        shutdown.request();
        reading
    });

    assert_eq!(reading.value, 528);
    assert!(stats.readings >= 1);
    assert_eq!(device.calls().connects, device.calls().disconnects);
}

#[tokio::test]
async fn shutdown_during_discovery_exits_within_one_poll_interval() {
    let poll_interval = Duration::from_millis(100);
    let shutdown = ShutdownFlag::new();
    let poller = Poller::new(
        SimulatedProvider::default(),
        config(poll_interval),
        shutdown.clone(),
    );

    let started = Instant::now();
    let (stats, _) = tokio::join!(poller.run(), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.request();
    });

    assert!(started.elapsed() < poll_interval * 4);
    assert!(poller.provider().polls() <= 2);
    assert_eq!(stats.iterations, 0);
}

#[tokio::test]
async fn connect_failures_do_not_stop_the_loop() {
    let device = SimulatedDevice::sensor(ADDRESS).failing_connect();
    let shutdown = ShutdownFlag::new();
    let poller = Poller::new(
        SimulatedProvider::with_device(device.clone()),
        config(Duration::from_millis(5)),
        shutdown.clone(),
    );

    let (stats, _) = tokio::join!(poller.run(), async {
        wait_until(|| device.calls().connects >= 3).await;
        shutdown.request();
    });

    assert!(stats.iterations >= 3);
    assert_eq!(stats.readings, 0);
    assert_eq!(stats.failures, stats.iterations);
}

#[tokio::test]
async fn read_failures_do_not_stop_the_loop() {
    let device = SimulatedDevice::sensor(ADDRESS).failing_read();
    let shutdown = ShutdownFlag::new();
    let poller = Poller::new(
        SimulatedProvider::with_device(device.clone()),
        config(Duration::from_millis(5)),
        shutdown.clone(),
    );

    let (stats, _) = tokio::join!(poller.run(), async {
        wait_until(|| device.calls().reads >= 2).await;
        shutdown.request();
    });

    assert!(stats.iterations >= 2);
    assert_eq!(stats.readings, 0);
    assert!(device.calls().disconnects >= 2);
}

#[tokio::test]
async fn disconnect_failures_do_not_stop_the_loop() {
    let device = SimulatedDevice::sensor(ADDRESS).failing_disconnect();
    let shutdown = ShutdownFlag::new();
    let poller = Poller::new(
        SimulatedProvider::with_device(device.clone()),
        config(Duration::from_millis(5)),
        shutdown.clone(),
    );

    let (stats, _) = tokio::join!(poller.run(), async {
        wait_until(|| device.calls().disconnects >= 2).await;
        shutdown.request();
    });

    assert!(stats.readings >= 2);
}

#[tokio::test]
async fn matching_by_name_ignores_other_devices() {
    let other = SimulatedDevice::sensor("11:22:33:44:55:66").with_name("Other");
    let sensor = SimulatedDevice::sensor(ADDRESS);
    let shutdown = ShutdownFlag::new();
    let poller = Poller::new(
        SimulatedProvider::new(vec![vec![other.clone(), sensor.clone()]]),
        PollerConfig::default()
            .with_poll_interval(Duration::from_millis(5))
            .with_cooldown(Duration::from_millis(5)),
        shutdown.clone(),
    );

    let (stats, _) = tokio::join!(poller.run(), async {
        wait_until(|| sensor.calls().reads >= 1).await;
        shutdown.request();
    });

    assert!(stats.readings >= 1);
    assert_eq!(other.calls().connects, 0);
    assert!(sensor.calls().connects >= 1);
}
