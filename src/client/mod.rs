// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device client contract.
//!
//! The coordinator does not know how bytes reach the plug. It talks to a
//! [`DeviceClient`], created by a [`DeviceConnector`] when the device is
//! registered. A Bluetooth LE implementation lives in the host application;
//! this crate ships [`SimulatedPlug`] for tests and demos.
//!
//! Every operation goes over the same physical link. The coordinator never
//! issues two of them at once, so implementations do not need their own
//! locking.

mod simulated;

pub use simulated::{SimulatedConnector, SimulatedPlug};

use std::future::Future;
use std::sync::Arc;

use crate::error::{DeviceError, SetupError};
use crate::types::{Brightness, DeviceAddress, DeviceMode, PowerReading};

/// Operations the coordinator needs from a connected plug.
///
/// Any call may fail or hang. The coordinator bounds every call with its own
/// timeout, so implementations should not retry internally.
///
/// Futures must be `Send` because refreshes run on spawned Tokio tasks.
/// Implementations may still be written with `async fn`.
pub trait DeviceClient: Send + Sync + 'static {
    /// Reads the current dimmer level.
    fn read(&self) -> impl Future<Output = Result<Brightness, DeviceError>> + Send;

    /// Reads the operating mode.
    fn get_mode(&self) -> impl Future<Output = Result<DeviceMode, DeviceError>> + Send;

    /// Reads the latest power measurement.
    fn read_power(&self) -> impl Future<Output = Result<PowerReading, DeviceError>> + Send;

    /// Switches the load on at the given level.
    fn turn_on(
        &self,
        brightness: Brightness,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Switches the load off.
    fn turn_off(&self) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Changes the operating mode.
    fn set_mode(&self, mode: DeviceMode) -> impl Future<Output = Result<(), DeviceError>> + Send;
}

impl<T: DeviceClient> DeviceClient for Arc<T> {
    fn read(&self) -> impl Future<Output = Result<Brightness, DeviceError>> + Send {
        (**self).read()
    }

    fn get_mode(&self) -> impl Future<Output = Result<DeviceMode, DeviceError>> + Send {
        (**self).get_mode()
    }

    fn read_power(&self) -> impl Future<Output = Result<PowerReading, DeviceError>> + Send {
        (**self).read_power()
    }

    fn turn_on(
        &self,
        brightness: Brightness,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send {
        (**self).turn_on(brightness)
    }

    fn turn_off(&self) -> impl Future<Output = Result<(), DeviceError>> + Send {
        (**self).turn_off()
    }

    fn set_mode(&self, mode: DeviceMode) -> impl Future<Output = Result<(), DeviceError>> + Send {
        (**self).set_mode(mode)
    }
}

/// Creates device clients for registered addresses.
///
/// A connector failure is a [`SetupError`]: it aborts registration and is not
/// retried by the coordinator.
pub trait DeviceConnector {
    /// The client type produced by this connector.
    type Client: DeviceClient;

    /// Looks up the device and builds a client for it.
    ///
    /// # Errors
    ///
    /// Returns `SetupError::NotFound` if no device answers at `address`, or
    /// `SetupError::Connect` if the client cannot be created.
    fn connect(
        &self,
        address: &DeviceAddress,
    ) -> impl Future<Output = Result<Self::Client, SetupError>> + Send;
}
