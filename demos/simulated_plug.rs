// SPDX-License-Identifier: MPL-2.0

//! Simulated plug walkthrough.
//!
//! Registers a simulated Zuli plug, attaches the light and power sensor
//! entities, then takes the plug offline for a while so the polling backoff
//! can be watched in the logs before it recovers.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=zuli_lib=debug cargo run --example simulated_plug -- [address]
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use zuli_lib::client::{SimulatedConnector, SimulatedPlug};
use zuli_lib::entity::{DimmerLight, Entity, PowerSensor, attach};
use zuli_lib::{Coordinator, CoordinatorConfig, PowerReading};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zuli_lib=info")),
        )
        .init();

    let address = env::args()
        .nth(1)
        .unwrap_or_else(|| "C4:BE:84:0A:11:22".to_string());

    println!("=== Zuli Simulated Plug ===");
    println!("Address: {address}");
    println!();

    let plug = Arc::new(SimulatedPlug::new(address.as_str()));
    plug.set_latency(Duration::from_millis(50));
    plug.set_power_reading(PowerReading {
        current_milliamps: 410,
        power_milliwatts: 49_500,
        power_factor: 0.97,
        voltage_millivolts: 120_300,
    });
    let connector = SimulatedConnector::new().with_plug(Arc::clone(&plug));

    // Short timings so the backoff is visible in seconds rather than minutes
    let config = CoordinatorConfig::new(address.as_str())
        .with_name("Living Room Lamp")
        .with_default_interval(Duration::from_secs(2))
        .with_max_interval(Duration::from_secs(16))
        .with_refresh_timeout(Duration::from_secs(1));
    let coordinator = Coordinator::setup(config, &connector).await?;

    let light = Arc::new(DimmerLight::new(&coordinator));
    attach(&coordinator, Arc::clone(&light));
    let sensors: Vec<_> = PowerSensor::all(&coordinator).into_iter().map(Arc::new).collect();
    for sensor in &sensors {
        attach(&coordinator, Arc::clone(sensor));
    }

    coordinator.register_subscriber(|snapshot, available| {
        println!(
            "  update: brightness={:?} mode={:?} available={available}",
            snapshot.brightness().map(|b| b.value()),
            snapshot.mode(),
        );
    });

    println!("{} ({})", light.name(), light.unique_id());
    println!("  available: {}", light.available());
    for sensor in &sensors {
        println!(
            "  {:<8} {:>8} {}",
            sensor.name(),
            sensor.value().unwrap_or_default(),
            sensor.unit()
        );
    }
    println!();

    println!("Turning the light on at 75%...");
    light.turn_on(Some(191)).await?;
    println!("  brightness (0-255): {:?}", light.brightness());
    println!();

    println!("Taking the plug offline for 30s...");
    plug.set_unreachable(true);
    for _ in 0..6 {
        tokio::time::sleep(Duration::from_secs(5)).await;
        println!(
            "  interval={:?} failures={} available={}",
            coordinator.current_interval(),
            coordinator.consecutive_failures(),
            light.available()
        );
    }

    println!("Bringing the plug back...");
    plug.set_unreachable(false);
    match coordinator.request_refresh_and_await().await {
        Ok(snapshot) => println!("  recovered: {snapshot:?}"),
        Err(error) => println!("  still failing: {error}"),
    }
    println!("  interval={:?}", coordinator.current_interval());

    coordinator.stop().await;
    println!();
    println!("Done.");
    Ok(())
}
