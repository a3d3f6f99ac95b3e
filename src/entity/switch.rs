// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appliance switch entity.

use parking_lot::Mutex;

use super::{DeviceInfo, Entity, RefreshOnDrop, unique_id};
use crate::client::DeviceClient;
use crate::coordinator::Coordinator;
use crate::error::CommandError;
use crate::state::StateSnapshot;
use crate::types::{Brightness, DeviceMode};

/// The plug seen as a plain on/off switch.
///
/// Only available while the plug is in [`DeviceMode::Appliance`] and the last
/// refresh succeeded. Turning it on drives the output to full level.
pub struct ApplianceSwitch<C: DeviceClient> {
    coordinator: Coordinator<C>,
    unique_id: String,
    device_info: DeviceInfo,
    state: Mutex<SwitchState>,
}

#[derive(Debug, Default)]
struct SwitchState {
    is_on: Option<bool>,
    mode: Option<DeviceMode>,
    last_update_success: bool,
}

impl<C: DeviceClient> ApplianceSwitch<C> {
    /// Creates the switch for a coordinator's plug.
    #[must_use]
    pub fn new(coordinator: &Coordinator<C>) -> Self {
        Self {
            unique_id: unique_id(coordinator.address(), "switch"),
            device_info: DeviceInfo::for_coordinator(coordinator),
            coordinator: coordinator.clone(),
            state: Mutex::new(SwitchState::default()),
        }
    }

    /// Returns the device registry information.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Returns whether the switch is on, or `None` if unknown.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.state.lock().is_on
    }

    /// Turns the appliance on.
    ///
    /// # Errors
    ///
    /// Returns the `CommandError` from the coordinator.
    pub async fn turn_on(&self) -> Result<(), CommandError> {
        let _refresh = RefreshOnDrop(&self.coordinator);
        let result = self.coordinator.turn_on(Brightness::MAX).await;
        self.settle(true, result)
    }

    /// Turns the appliance off.
    ///
    /// # Errors
    ///
    /// Returns the `CommandError` from the coordinator.
    pub async fn turn_off(&self) -> Result<(), CommandError> {
        let _refresh = RefreshOnDrop(&self.coordinator);
        let result = self.coordinator.turn_off().await;
        self.settle(false, result)
    }

    fn settle(&self, is_on: bool, result: Result<(), CommandError>) -> Result<(), CommandError> {
        self.state.lock().is_on = match &result {
            Ok(()) => Some(is_on),
            Err(error) => {
                tracing::warn!(unique_id = %self.unique_id, %error, "Switch command failed");
                None
            }
        };
        result
    }
}

impl<C: DeviceClient> Entity for ApplianceSwitch<C> {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        "Switch"
    }

    fn available(&self) -> bool {
        let state = self.state.lock();
        state.mode == Some(DeviceMode::Appliance) && state.last_update_success
    }

    fn handle_update(&self, snapshot: &StateSnapshot, last_update_success: bool) {
        let mut state = self.state.lock();
        state.is_on = snapshot.is_on();
        state.mode = snapshot.mode();
        state.last_update_success = last_update_success;
    }
}

impl<C: DeviceClient> std::fmt::Debug for ApplianceSwitch<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplianceSwitch")
            .field("unique_id", &self.unique_id)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
