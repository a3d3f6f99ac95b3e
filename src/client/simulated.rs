// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory plug for tests and demos.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::{DeviceClient, DeviceConnector};
use crate::error::{DeviceError, SetupError};
use crate::types::{Brightness, DeviceAddress, DeviceMode, PowerReading};

/// Simulated smartplug with scriptable faults.
///
/// Every call sleeps for the configured latency (on the Tokio clock, so a
/// paused test clock skips it) and then either fails or applies the
/// operation. Counters record how the plug was used.
///
/// # Examples
///
/// ```
/// use zuli_lib::client::{DeviceClient, SimulatedPlug};
/// use zuli_lib::types::Brightness;
///
/// # async fn example() {
/// let plug = SimulatedPlug::new("C4:BE:84:0A:11:22");
/// plug.turn_on(Brightness::new(60).unwrap()).await.unwrap();
/// assert_eq!(plug.read().await.unwrap().value(), 60);
///
/// plug.fail_next(1);
/// assert!(plug.read().await.is_err());
/// # }
/// ```
#[derive(Debug)]
pub struct SimulatedPlug {
    address: DeviceAddress,
    state: Mutex<PlugState>,
    faults: Mutex<Faults>,
    latency: Mutex<Duration>,
    active_calls: AtomicUsize,
    max_concurrent_calls: AtomicUsize,
    reads: AtomicU64,
    writes: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
struct PlugState {
    brightness: Brightness,
    mode: DeviceMode,
    power: PowerReading,
}

#[derive(Debug, Default)]
struct Faults {
    unreachable: bool,
    fail_next: u32,
}

/// Decrements the active call counter even if the call is cancelled.
struct CallGuard<'a>(&'a AtomicUsize);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SimulatedPlug {
    /// Creates a reachable plug in dimmable light mode, switched off.
    #[must_use]
    pub fn new(address: impl Into<DeviceAddress>) -> Self {
        Self {
            address: address.into(),
            state: Mutex::new(PlugState {
                brightness: Brightness::OFF,
                mode: DeviceMode::DimmableLight,
                power: PowerReading {
                    current_milliamps: 0,
                    power_milliwatts: 0,
                    power_factor: 1.0,
                    voltage_millivolts: 120_000,
                },
            }),
            faults: Mutex::new(Faults::default()),
            latency: Mutex::new(Duration::ZERO),
            active_calls: AtomicUsize::new(0),
            max_concurrent_calls: AtomicUsize::new(0),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Returns the plug's address.
    #[must_use]
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Makes every call fail with a transport error until cleared.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.faults.lock().unreachable = unreachable;
    }

    /// Makes the next `count` calls fail with a transport error.
    pub fn fail_next(&self, count: u32) {
        self.faults.lock().fail_next = count;
    }

    /// Sets how long every call takes.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Changes the dimmer level as if someone pressed the physical button.
    pub fn set_brightness(&self, brightness: Brightness) {
        self.state.lock().brightness = brightness;
    }

    /// Changes the operating mode behind the coordinator's back.
    pub fn set_device_mode(&self, mode: DeviceMode) {
        self.state.lock().mode = mode;
    }

    /// Sets the measurement returned by `read_power`.
    pub fn set_power_reading(&self, reading: PowerReading) {
        self.state.lock().power = reading;
    }

    /// Current dimmer level on the device.
    #[must_use]
    pub fn brightness(&self) -> Brightness {
        self.state.lock().brightness
    }

    /// Current operating mode on the device.
    #[must_use]
    pub fn mode(&self) -> DeviceMode {
        self.state.lock().mode
    }

    /// Number of brightness reads, i.e. refresh sequences started.
    #[must_use]
    pub fn read_sequences(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write calls received.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were ever in progress at once.
    #[must_use]
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls.load(Ordering::SeqCst)
    }

    /// Simulates one round trip: latency, then fault injection.
    async fn round_trip(&self) -> Result<CallGuard<'_>, DeviceError> {
        let active = self.active_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_calls.fetch_max(active, Ordering::SeqCst);
        let guard = CallGuard(&self.active_calls);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut faults = self.faults.lock();
        if faults.unreachable {
            return Err(DeviceError::Transport("device unreachable".to_string()));
        }
        if faults.fail_next > 0 {
            faults.fail_next -= 1;
            return Err(DeviceError::Transport("injected failure".to_string()));
        }

        Ok(guard)
    }
}

impl DeviceClient for SimulatedPlug {
    async fn read(&self) -> Result<Brightness, DeviceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let _call = self.round_trip().await?;
        Ok(self.state.lock().brightness)
    }

    async fn get_mode(&self) -> Result<DeviceMode, DeviceError> {
        let _call = self.round_trip().await?;
        Ok(self.state.lock().mode)
    }

    async fn read_power(&self) -> Result<PowerReading, DeviceError> {
        let _call = self.round_trip().await?;
        Ok(self.state.lock().power)
    }

    async fn turn_on(&self, brightness: Brightness) -> Result<(), DeviceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let _call = self.round_trip().await?;
        self.state.lock().brightness = brightness;
        Ok(())
    }

    async fn turn_off(&self) -> Result<(), DeviceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let _call = self.round_trip().await?;
        self.state.lock().brightness = Brightness::OFF;
        Ok(())
    }

    async fn set_mode(&self, mode: DeviceMode) -> Result<(), DeviceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let _call = self.round_trip().await?;
        self.state.lock().mode = mode;
        Ok(())
    }
}

/// Connector that hands out registered [`SimulatedPlug`]s.
///
/// Unknown addresses fail with `SetupError::NotFound`. A plug marked
/// unreachable fails with `SetupError::Connect`.
#[derive(Debug, Default)]
pub struct SimulatedConnector {
    plugs: HashMap<DeviceAddress, Arc<SimulatedPlug>>,
}

impl SimulatedConnector {
    /// Creates a connector that knows no plugs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a plug discoverable.
    #[must_use]
    pub fn with_plug(mut self, plug: Arc<SimulatedPlug>) -> Self {
        self.plugs.insert(plug.address().clone(), plug);
        self
    }
}

impl DeviceConnector for SimulatedConnector {
    type Client = Arc<SimulatedPlug>;

    async fn connect(&self, address: &DeviceAddress) -> Result<Self::Client, SetupError> {
        let plug = self
            .plugs
            .get(address)
            .ok_or_else(|| SetupError::NotFound {
                address: address.to_string(),
            })?;

        if plug.faults.lock().unreachable {
            return Err(SetupError::Connect {
                address: address.to_string(),
                source: DeviceError::NotConnected,
            });
        }

        Ok(Arc::clone(plug))
    }
}
