// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operating mode of the plug.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// What the plug is wired to drive.
///
/// In appliance mode the plug acts as a plain relay. In dimmable light mode
/// it phase-dims the load.
///
/// # Examples
///
/// ```
/// use zuli_lib::types::DeviceMode;
///
/// let mode: DeviceMode = "Dimmable Light".parse().unwrap();
/// assert_eq!(mode, DeviceMode::DimmableLight);
/// assert!(!mode.is_appliance());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMode {
    /// On/off relay.
    Appliance,
    /// Dimmer.
    DimmableLight,
}

impl DeviceMode {
    /// All modes, in display order.
    pub const ALL: [Self; 2] = [Self::Appliance, Self::DimmableLight];

    /// Maps the device's appliance flag to a mode.
    #[must_use]
    pub const fn from_appliance_flag(is_appliance: bool) -> Self {
        if is_appliance {
            Self::Appliance
        } else {
            Self::DimmableLight
        }
    }

    /// Returns `true` for appliance mode.
    #[must_use]
    pub const fn is_appliance(self) -> bool {
        matches!(self, Self::Appliance)
    }

    /// Human readable option label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Appliance => "Appliance",
            Self::DimmableLight => "Dimmable Light",
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DeviceMode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.label() == s)
            .ok_or_else(|| ValueError::InvalidMode(s.to_string()))
    }
}
