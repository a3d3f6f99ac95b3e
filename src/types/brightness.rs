// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brightness type for the plug's dimmer.
//!
//! The plug reports and accepts brightness as a percentage. Home automation
//! front ends usually speak a 0-255 scale, so conversions live here too.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Brightness level as a percentage (0-100).
///
/// 0 means the load is off and 100 is full output.
///
/// # Examples
///
/// ```
/// use zuli_lib::types::Brightness;
///
/// let level = Brightness::new(75).unwrap();
/// assert_eq!(level.value(), 75);
/// assert!(level.is_on());
///
/// assert!(Brightness::OFF.value() == 0);
/// assert!(Brightness::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Brightness(u8);

impl Brightness {
    /// Load switched off (0%).
    pub const OFF: Self = Self(0);

    /// Full output (100%).
    pub const MAX: Self = Self(100);

    /// Creates a new brightness value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: u16::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a brightness value, clamping to the valid range.
    #[must_use]
    pub const fn clamped(value: u8) -> Self {
        if value > 100 { Self(100) } else { Self(value) }
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns `true` if the load is powered at all.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        self.0 > 0
    }

    /// Converts a 0-255 level to a percentage, rounding to nearest.
    ///
    /// ```
    /// use zuli_lib::types::Brightness;
    ///
    /// assert_eq!(Brightness::from_u8_scale(255).value(), 100);
    /// assert_eq!(Brightness::from_u8_scale(128).value(), 50);
    /// ```
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_u8_scale(level: u8) -> Self {
        Self::clamped((f32::from(level) / 255.0 * 100.0).round() as u8)
    }

    /// Converts the percentage to a 0-255 level, rounding to nearest.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_u8_scale(&self) -> u8 {
        // Safe: self.0 <= 100, so the result is within 0..=255
        (f32::from(self.0) / 100.0 * 255.0).round() as u8
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for Brightness {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Brightness> for u8 {
    fn from(value: Brightness) -> Self {
        value.0
    }
}
