// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power measurement sensors.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{DeviceInfo, Entity, unique_id};
use crate::client::DeviceClient;
use crate::coordinator::Coordinator;
use crate::state::StateSnapshot;
use crate::types::PowerReading;

/// Which field of a [`PowerReading`] a sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerSensorKind {
    /// Apparent power.
    Power,
    /// RMS current.
    Current,
    /// RMS voltage.
    Voltage,
}

impl PowerSensorKind {
    /// All kinds, in registration order.
    pub const ALL: [Self; 3] = [Self::Power, Self::Current, Self::Voltage];

    /// Entity name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Power => "Power",
            Self::Current => "Current",
            Self::Voltage => "Voltage",
        }
    }

    /// Unit of the reported value.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Power => "mVA",
            Self::Current => "mA",
            Self::Voltage => "mV",
        }
    }

    /// Extracts this sensor's value from a reading.
    #[must_use]
    pub const fn value_of(self, reading: &PowerReading) -> u32 {
        match self {
            Self::Power => reading.power_milliwatts,
            Self::Current => reading.current_milliamps,
            Self::Voltage => reading.voltage_millivolts,
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Current => "current",
            Self::Voltage => "voltage",
        }
    }
}

/// One power measurement of the plug.
///
/// The value only changes when a snapshot carries a power reading; otherwise
/// the last known value is kept.
#[derive(Debug)]
pub struct PowerSensor {
    kind: PowerSensorKind,
    unique_id: String,
    device_info: DeviceInfo,
    state: Mutex<SensorState>,
}

#[derive(Debug, Default)]
struct SensorState {
    value: Option<u32>,
    last_update_success: bool,
}

impl PowerSensor {
    /// Creates a sensor of the given kind for a coordinator's plug.
    #[must_use]
    pub fn new<C: DeviceClient>(coordinator: &Coordinator<C>, kind: PowerSensorKind) -> Self {
        Self {
            kind,
            unique_id: unique_id(coordinator.address(), kind.suffix()),
            device_info: DeviceInfo::for_coordinator(coordinator),
            state: Mutex::new(SensorState::default()),
        }
    }

    /// Creates one sensor of every kind.
    #[must_use]
    pub fn all<C: DeviceClient>(coordinator: &Coordinator<C>) -> [Self; 3] {
        PowerSensorKind::ALL.map(|kind| Self::new(coordinator, kind))
    }

    /// Returns the measured quantity.
    #[must_use]
    pub fn kind(&self) -> PowerSensorKind {
        self.kind
    }

    /// Returns the unit of [`value`](Self::value).
    #[must_use]
    pub fn unit(&self) -> &'static str {
        self.kind.unit()
    }

    /// Returns the device registry information.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Returns the last known value, or `None` before the first reading.
    #[must_use]
    pub fn value(&self) -> Option<u32> {
        self.state.lock().value
    }
}

impl Entity for PowerSensor {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        self.kind.name()
    }

    fn available(&self) -> bool {
        self.state.lock().last_update_success
    }

    fn handle_update(&self, snapshot: &StateSnapshot, last_update_success: bool) {
        let mut state = self.state.lock();
        state.last_update_success = last_update_success;
        if let Some(reading) = snapshot.power_reading() {
            state.value = Some(self.kind.value_of(&reading));
        }
    }
}
