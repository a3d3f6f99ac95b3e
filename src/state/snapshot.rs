// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cached device state.

use serde::{Deserialize, Serialize};

use crate::types::{Brightness, DeviceMode, PowerReading};

/// Complete state of a plug as of one successful refresh.
///
/// A snapshot is produced as a unit: either all three reads of a refresh
/// succeed and a new snapshot replaces the old one, or the refresh fails and
/// the previous snapshot stays. All fields are optional because nothing is
/// known before the first successful refresh.
///
/// # Examples
///
/// ```
/// use zuli_lib::state::StateSnapshot;
/// use zuli_lib::types::{Brightness, DeviceMode};
///
/// let snapshot = StateSnapshot::unknown();
/// assert!(snapshot.is_unknown());
///
/// let snapshot = StateSnapshot::new(Brightness::new(40).unwrap(), DeviceMode::DimmableLight, None);
/// assert_eq!(snapshot.is_appliance(), Some(false));
/// assert_eq!(snapshot.is_on(), Some(true));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    brightness: Option<Brightness>,
    mode: Option<DeviceMode>,
    power_reading: Option<PowerReading>,
}

impl StateSnapshot {
    /// Creates a snapshot from a complete set of reads.
    #[must_use]
    pub fn new(
        brightness: Brightness,
        mode: DeviceMode,
        power_reading: Option<PowerReading>,
    ) -> Self {
        Self {
            brightness: Some(brightness),
            mode: Some(mode),
            power_reading,
        }
    }

    /// The snapshot held before anything is known about the device.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            brightness: None,
            mode: None,
            power_reading: None,
        }
    }

    /// Returns `true` if no field is known.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.brightness.is_none() && self.mode.is_none() && self.power_reading.is_none()
    }

    /// Dimmer level, if known.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        self.brightness
    }

    /// Operating mode, if known.
    #[must_use]
    pub fn mode(&self) -> Option<DeviceMode> {
        self.mode
    }

    /// Whether the plug is in appliance mode, if known.
    #[must_use]
    pub fn is_appliance(&self) -> Option<bool> {
        self.mode.map(DeviceMode::is_appliance)
    }

    /// Whether the load is powered, if known.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.brightness.map(|b| b.is_on())
    }

    /// Latest power measurement, if available.
    #[must_use]
    pub fn power_reading(&self) -> Option<PowerReading> {
        self.power_reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> PowerReading {
        PowerReading {
            current_milliamps: 410,
            power_milliwatts: 49_200,
            power_factor: 0.95,
            voltage_millivolts: 120_100,
        }
    }

    #[test]
    fn unknown_snapshot_has_no_fields() {
        let snapshot = StateSnapshot::unknown();
        assert!(snapshot.is_unknown());
        assert_eq!(snapshot.is_on(), None);
        assert_eq!(snapshot.is_appliance(), None);
        assert_eq!(snapshot, StateSnapshot::default());
    }

    #[test]
    fn complete_snapshot_accessors() {
        let snapshot = StateSnapshot::new(Brightness::OFF, DeviceMode::Appliance, Some(reading()));

        assert!(!snapshot.is_unknown());
        assert_eq!(snapshot.is_on(), Some(false));
        assert_eq!(snapshot.is_appliance(), Some(true));
        assert_eq!(snapshot.power_reading(), Some(reading()));
    }

    #[test]
    fn serializes_to_json() {
        let snapshot = StateSnapshot::new(
            Brightness::new(75).unwrap(),
            DeviceMode::DimmableLight,
            Some(reading()),
        );

        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["brightness"], 75);
        assert_eq!(json["mode"], "dimmable_light");
        assert_eq!(json["power_reading"]["voltage_millivolts"], 120_100);

        let back: StateSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
