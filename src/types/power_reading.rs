// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Electrical measurements reported by the plug.

use serde::{Deserialize, Serialize};

/// One power measurement sample.
///
/// The plug reports integer milli-units. `power_milliwatts` is apparent
/// power (mVA) as measured by the metering chip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerReading {
    /// RMS current in milliamps.
    pub current_milliamps: u32,
    /// Apparent power in milliwatts.
    pub power_milliwatts: u32,
    /// Power factor (0.0-1.0).
    pub power_factor: f64,
    /// RMS voltage in millivolts.
    pub voltage_millivolts: u32,
}

impl PowerReading {
    /// Returns the apparent power in Watts.
    #[must_use]
    pub fn watts(&self) -> f64 {
        f64::from(self.power_milliwatts) / 1000.0
    }

    /// Returns the voltage in Volts.
    #[must_use]
    pub fn volts(&self) -> f64 {
        f64::from(self.voltage_millivolts) / 1000.0
    }

    /// Returns the current in Amperes.
    #[must_use]
    pub fn amps(&self) -> f64 {
        f64::from(self.current_milliamps) / 1000.0
    }
}
