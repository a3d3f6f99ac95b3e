// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operating mode selector entity.

use parking_lot::Mutex;

use super::{DeviceInfo, Entity, RefreshOnDrop, unique_id};
use crate::client::DeviceClient;
use crate::coordinator::Coordinator;
use crate::error::Error;
use crate::state::StateSnapshot;
use crate::types::DeviceMode;

/// Selector between [`DeviceMode::Appliance`] and
/// [`DeviceMode::DimmableLight`].
///
/// Hidden by default: changing the mode is a one-off installation choice.
pub struct ModeSelect<C: DeviceClient> {
    coordinator: Coordinator<C>,
    unique_id: String,
    device_info: DeviceInfo,
    state: Mutex<SelectState>,
}

#[derive(Debug, Default)]
struct SelectState {
    mode: Option<DeviceMode>,
    last_update_success: bool,
}

impl<C: DeviceClient> ModeSelect<C> {
    /// Creates the selector for a coordinator's plug.
    #[must_use]
    pub fn new(coordinator: &Coordinator<C>) -> Self {
        Self {
            unique_id: unique_id(coordinator.address(), "mode"),
            device_info: DeviceInfo::for_coordinator(coordinator),
            coordinator: coordinator.clone(),
            state: Mutex::new(SelectState::default()),
        }
    }

    /// Returns the device registry information.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Returns the selectable option labels.
    #[must_use]
    pub fn options(&self) -> [&'static str; 2] {
        DeviceMode::ALL.map(DeviceMode::label)
    }

    /// Returns the label of the current mode, or `None` if unknown.
    #[must_use]
    pub fn current_option(&self) -> Option<&'static str> {
        self.state.lock().mode.map(DeviceMode::label)
    }

    /// Whether hosts should show this entity without user action.
    #[must_use]
    pub fn visible_by_default(&self) -> bool {
        false
    }

    /// Switches the plug to the mode named by `option`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` for an unknown option (nothing is sent to the
    /// device), or `Error::Command` if the write fails.
    pub async fn select_option(&self, option: &str) -> Result<(), Error> {
        let mode: DeviceMode = option.parse()?;

        let _refresh = RefreshOnDrop(&self.coordinator);
        let result = self.coordinator.set_mode(mode).await;
        self.state.lock().mode = match &result {
            Ok(()) => Some(mode),
            Err(error) => {
                tracing::error!(unique_id = %self.unique_id, %error, "Unable to set mode");
                None
            }
        };
        Ok(result?)
    }
}

impl<C: DeviceClient> Entity for ModeSelect<C> {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        "Mode"
    }

    fn available(&self) -> bool {
        self.state.lock().last_update_success
    }

    fn handle_update(&self, snapshot: &StateSnapshot, last_update_success: bool) {
        let mut state = self.state.lock();
        state.mode = snapshot.mode();
        state.last_update_success = last_update_success;
    }
}

impl<C: DeviceClient> std::fmt::Debug for ModeSelect<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeSelect")
            .field("unique_id", &self.unique_id)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
