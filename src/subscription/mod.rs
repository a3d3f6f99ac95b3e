// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscriber notification.
//!
//! Every refresh completion, successful or not, is fanned out to the
//! registered listeners as a `(snapshot, last_update_success)` pair.
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
//! let sub_id = coordinator.register_subscriber(|snapshot, available| {
//!     println!("brightness={:?} available={available}", snapshot.brightness());
//! });
//!
//! coordinator.start().await?;
//!
//! // Later, unsubscribe
//! coordinator.unregister_subscriber(sub_id);
//! # Ok(())
//! # }
//! ```

mod registry;

pub use registry::{SubscriberRegistry, SubscriptionId};
