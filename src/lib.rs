// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Zuli Lib - Adaptive polling for Zuli Bluetooth smartplugs.
//!
//! A Zuli plug does not push state changes, so this library polls it. One
//! [`Coordinator`] per plug keeps a cached snapshot of its state and tells
//! subscribers whenever a refresh completes.
//!
//! # Features
//!
//! - **Adaptive polling**: every 60s while healthy, doubling up to 15 min
//!   while the plug is unreachable, back to 60s on the first success
//! - **Single flight**: concurrent refresh requests share one device read
//! - **Bounded refreshes**: a refresh that hangs fails after 15s
//! - **Serialized link access**: reads and writes never overlap on the radio
//! - **Entities**: light, switch, mode selector and power sensors that follow
//!   the cached state
//!
//! # Quick Start
//!
//! The transport is supplied by the host through the
//! [`DeviceClient`](client::DeviceClient) and
//! [`DeviceConnector`](client::DeviceConnector) traits. The bundled
//! [`SimulatedPlug`](client::SimulatedPlug) is used here.
//!
//! ```no_run
//! use std::sync::Arc;
//! use zuli_lib::{Coordinator, CoordinatorConfig};
//! use zuli_lib::client::{SimulatedConnector, SimulatedPlug};
//! use zuli_lib::entity::{attach, ApplianceSwitch, Entity, PowerSensor};
//!
//! #[tokio::main]
//! async fn main() -> zuli_lib::Result<()> {
//!     let plug = Arc::new(SimulatedPlug::new("C4:BE:84:0A:11:22"));
//!     let connector = SimulatedConnector::new().with_plug(plug);
//!
//!     let config = CoordinatorConfig::new("C4:BE:84:0A:11:22").with_name("Kettle");
//!     let coordinator = Coordinator::setup(config, &connector).await?;
//!
//!     let switch = Arc::new(ApplianceSwitch::new(&coordinator));
//!     attach(&coordinator, Arc::clone(&switch));
//!     for sensor in PowerSensor::all(&coordinator) {
//!         attach(&coordinator, Arc::new(sensor));
//!     }
//!
//!     if switch.available() {
//!         switch.turn_on().await?;
//!     }
//!
//!     coordinator.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Raw Subscriptions
//!
//! ```no_run
//! use std::sync::Arc;
//! use zuli_lib::{Coordinator, CoordinatorConfig};
//! use zuli_lib::client::SimulatedPlug;
//!
//! # async fn example() -> zuli_lib::Result<()> {
//! let plug = Arc::new(SimulatedPlug::new("C4:BE:84:0A:11:22"));
//! let coordinator = Coordinator::new(CoordinatorConfig::new("C4:BE:84:0A:11:22"), plug)?;
//!
//! coordinator.register_subscriber(|snapshot, available| {
//!     println!("mode={:?} available={available}", snapshot.mode());
//! });
//! coordinator.start().await?;
//!
//! // Wait for a fresh reading
//! let snapshot = coordinator.request_refresh_and_await().await?;
//! println!("power: {:?}", snapshot.power_reading());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod state;
pub mod subscription;
pub mod types;

pub use coordinator::{BackoffPolicy, Coordinator, CoordinatorConfig, CoordinatorPhase};
pub use error::{
    CommandError, DeviceError, Error, RefreshError, Result, SetupError, ValueError,
};
pub use state::StateSnapshot;
pub use subscription::SubscriptionId;
pub use types::{Brightness, DeviceAddress, DeviceMode, PowerReading};
