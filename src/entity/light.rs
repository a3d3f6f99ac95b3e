// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dimmable light entity.

use std::time::Duration;

use parking_lot::Mutex;

use super::{DeviceInfo, Entity, RefreshOnDrop, unique_id};
use crate::client::DeviceClient;
use crate::coordinator::Coordinator;
use crate::error::CommandError;
use crate::state::StateSnapshot;
use crate::types::{Brightness, DeviceMode};

/// The plug seen as a dimmable light.
///
/// Only available while the plug is in [`DeviceMode::DimmableLight`] and the
/// last refresh succeeded. Brightness is exposed on the 0-255 scale hosts
/// use for lights.
pub struct DimmerLight<C: DeviceClient> {
    coordinator: Coordinator<C>,
    unique_id: String,
    device_info: DeviceInfo,
    state: Mutex<LightState>,
}

#[derive(Debug, Default)]
struct LightState {
    brightness: Option<Brightness>,
    mode: Option<DeviceMode>,
    last_update_success: bool,
}

impl<C: DeviceClient> DimmerLight<C> {
    /// How long the plug takes to finish its dimming ramp after a write.
    pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

    /// Creates the light for a coordinator's plug.
    #[must_use]
    pub fn new(coordinator: &Coordinator<C>) -> Self {
        Self {
            unique_id: unique_id(coordinator.address(), "light"),
            device_info: DeviceInfo::for_coordinator(coordinator),
            coordinator: coordinator.clone(),
            state: Mutex::new(LightState::default()),
        }
    }

    /// Returns the device registry information.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Returns whether the light is on, or `None` if unknown.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.state.lock().brightness.map(|b| b.is_on())
    }

    /// Returns the brightness on the 0-255 scale, or `None` if unknown.
    #[must_use]
    pub fn brightness(&self) -> Option<u8> {
        self.state.lock().brightness.map(|b| b.to_u8_scale())
    }

    /// Turns the light on.
    ///
    /// `level` is on the 0-255 scale; `None` or `0` means full brightness.
    ///
    /// # Errors
    ///
    /// Returns the `CommandError` from the coordinator. The brightness is
    /// unknown until the follow-up refresh completes. That refresh is
    /// requested whatever the outcome, even if this future is dropped.
    pub async fn turn_on(&self, level: Option<u8>) -> Result<(), CommandError> {
        let brightness = level
            .filter(|level| *level > 0)
            .map_or(Brightness::MAX, Brightness::from_u8_scale);
        let _refresh = RefreshOnDrop(&self.coordinator);
        let result = self.coordinator.turn_on(brightness).await;
        self.settle(brightness, result).await
    }

    /// Turns the light off.
    ///
    /// # Errors
    ///
    /// See [`turn_on`](Self::turn_on).
    pub async fn turn_off(&self) -> Result<(), CommandError> {
        let _refresh = RefreshOnDrop(&self.coordinator);
        let result = self.coordinator.turn_off().await;
        self.settle(Brightness::OFF, result).await
    }

    async fn settle(
        &self,
        brightness: Brightness,
        result: Result<(), CommandError>,
    ) -> Result<(), CommandError> {
        match &result {
            Ok(()) => {
                self.state.lock().brightness = Some(brightness);
                tokio::time::sleep(Self::SETTLE_DELAY).await;
            }
            Err(error) => {
                tracing::warn!(unique_id = %self.unique_id, %error, "Light command failed");
                self.state.lock().brightness = None;
            }
        }
        result
    }
}

impl<C: DeviceClient> Entity for DimmerLight<C> {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        "Dimmer"
    }

    fn available(&self) -> bool {
        let state = self.state.lock();
        state.mode == Some(DeviceMode::DimmableLight) && state.last_update_success
    }

    fn handle_update(&self, snapshot: &StateSnapshot, last_update_success: bool) {
        let mut state = self.state.lock();
        state.brightness = snapshot.brightness();
        state.mode = snapshot.mode();
        state.last_update_success = last_update_success;
    }
}

impl<C: DeviceClient> std::fmt::Debug for DimmerLight<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DimmerLight")
            .field("unique_id", &self.unique_id)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
