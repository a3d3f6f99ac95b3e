// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for smartplug state and commands.
//!
//! Each type checks its range at construction time, so a snapshot or a
//! command can never carry an impossible value.
//!
//! # Types
//!
//! - [`Brightness`] - Dimmer level (0-100%)
//! - [`DeviceMode`] - Appliance or dimmable light
//! - [`PowerReading`] - Current, power, power factor and voltage
//! - [`DeviceAddress`] - Normalized device address

mod address;
mod brightness;
mod mode;
mod power_reading;

pub use address::DeviceAddress;
pub use brightness::Brightness;
pub use mode::DeviceMode;
pub use power_reading::PowerReading;
