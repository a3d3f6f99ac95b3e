// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state types.
//!
//! The coordinator caches one [`StateSnapshot`] per device and hands copies
//! of it to subscribers.
//!
//! # Examples
//!
//! ```
//! use zuli_lib::state::StateSnapshot;
//! use zuli_lib::types::{Brightness, DeviceMode};
//!
//! let snapshot = StateSnapshot::new(Brightness::MAX, DeviceMode::Appliance, None);
//! assert_eq!(snapshot.is_on(), Some(true));
//! assert!(snapshot.power_reading().is_none());
//! ```

mod snapshot;

pub use snapshot::StateSnapshot;
