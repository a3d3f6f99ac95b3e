// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device address type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Address identifying one physical plug.
///
/// The value is opaque to this library. It is trimmed and upper-cased on
/// construction so `aa:bb:..` and `AA:BB:..` name the same device.
///
/// # Examples
///
/// ```
/// use zuli_lib::types::DeviceAddress;
///
/// let addr = DeviceAddress::new(" c4:be:84:0a:11:22 ");
/// assert_eq!(addr.as_str(), "C4:BE:84:0A:11:22");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Creates a normalized device address.
    #[must_use]
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().trim().to_uppercase())
    }

    /// Returns the normalized address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the address is empty after trimming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceAddress({})", self.0)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for DeviceAddress {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}
