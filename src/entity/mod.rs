// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-facing entities built on a [`Coordinator`].
//!
//! Each entity keeps its own view of the device, updated from coordinator
//! notifications, and exposes it the way a home automation host expects:
//!
//! - [`DimmerLight`] - the plug as a dimmable light (0-255 brightness)
//! - [`ApplianceSwitch`] - the plug as an on/off switch
//! - [`ModeSelect`] - appliance / dimmable light selector
//! - [`PowerSensor`] - power, current and voltage readings
//!
//! Write operations follow the same rules everywhere: optimistic local state
//! on success, unknown state on failure, and a [`Coordinator::request_refresh`]
//! afterwards in both cases, including when the caller cancels the write.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use zuli_lib::{Coordinator, CoordinatorConfig};
//! use zuli_lib::client::{SimulatedConnector, SimulatedPlug};
//! use zuli_lib::entity::{attach, DimmerLight, Entity};
//!
//! # async fn example() -> zuli_lib::Result<()> {
//! let plug = Arc::new(SimulatedPlug::new("C4:BE:84:0A:11:22"));
//! let connector = SimulatedConnector::new().with_plug(plug);
//! let coordinator =
//!     Coordinator::setup(CoordinatorConfig::new("C4:BE:84:0A:11:22"), &connector).await?;
//!
//! let light = Arc::new(DimmerLight::new(&coordinator));
//! attach(&coordinator, Arc::clone(&light));
//!
//! light.turn_on(Some(128)).await?;
//! println!("{}: on={:?} available={}", light.name(), light.is_on(), light.available());
//! # Ok(())
//! # }
//! ```

mod light;
mod select;
mod sensor;
mod switch;

pub use light::DimmerLight;
pub use select::ModeSelect;
pub use sensor::{PowerSensor, PowerSensorKind};
pub use switch::ApplianceSwitch;

use std::sync::Arc;

use serde::Serialize;

use crate::client::DeviceClient;
use crate::coordinator::Coordinator;
use crate::state::StateSnapshot;
use crate::subscription::SubscriptionId;
use crate::types::DeviceAddress;

/// Prefix of every unique id.
pub const DOMAIN: &str = "zuli";

/// Something that renders coordinator state.
pub trait Entity: Send + Sync + 'static {
    /// Stable identifier, unique across all devices.
    fn unique_id(&self) -> &str;

    /// Entity name shown next to the device name.
    fn name(&self) -> &str;

    /// Whether the host should show the entity as available.
    fn available(&self) -> bool;

    /// Applies a coordinator notification.
    fn handle_update(&self, snapshot: &StateSnapshot, last_update_success: bool);
}

/// Seeds an entity from the cached snapshot and subscribes it to updates.
///
/// The subscription lasts until it is unregistered or the coordinator stops.
pub fn attach<C, E>(coordinator: &Coordinator<C>, entity: Arc<E>) -> SubscriptionId
where
    C: DeviceClient,
    E: Entity,
{
    let (snapshot, success) = coordinator.current_snapshot();
    entity.handle_update(&snapshot, success);

    tracing::debug!(
        address = %coordinator.address(),
        unique_id = entity.unique_id(),
        "Attaching entity"
    );
    coordinator.register_subscriber(move |snapshot, success| {
        entity.handle_update(snapshot, success);
    })
}

/// Device registry information shared by all entities of one plug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Device address, used as the device identifier.
    pub identifier: DeviceAddress,
    /// Always `"Zuli"`.
    pub manufacturer: &'static str,
    /// Always `"Smartplug"`.
    pub model: &'static str,
    /// Friendly device name.
    pub name: String,
}

impl DeviceInfo {
    /// Builds the device information for a coordinator's plug.
    #[must_use]
    pub fn for_coordinator<C: DeviceClient>(coordinator: &Coordinator<C>) -> Self {
        Self {
            identifier: coordinator.address().clone(),
            manufacturer: "Zuli",
            model: "Smartplug",
            name: coordinator.name().to_string(),
        }
    }
}

fn unique_id(address: &DeviceAddress, suffix: &str) -> String {
    format!("{DOMAIN}_{address}_{suffix}")
}

/// Requests a refresh when dropped.
///
/// Created before a write is sent, so the follow-up refresh also happens if
/// the caller drops the command future part way through.
struct RefreshOnDrop<'a, C: DeviceClient>(&'a Coordinator<C>);

impl<C: DeviceClient> Drop for RefreshOnDrop<'_, C> {
    fn drop(&mut self) {
        self.0.request_refresh();
    }
}
