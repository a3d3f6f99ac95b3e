// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adaptive polling coordinator.
//!
//! One [`Coordinator`] manages one plug. It polls the device on a timer,
//! caches the last complete [`StateSnapshot`](crate::state::StateSnapshot),
//! and fans every refresh outcome out to subscribers.
//!
//! # Scheduling
//!
//! The timer fires `interval` after the start of the latest refresh. An
//! explicit refresh request therefore also resets the timer. The interval
//! follows a [`BackoffPolicy`]:
//!
//! | Outcome | Next interval |
//! |---------|---------------|
//! | Success | `default_interval` (60s) |
//! | Failure or timeout | `min(interval * 2, max_interval)` (up to 900s) |
//!
//! Polling never gives up; an unreachable plug is polled every
//! `max_interval` until it comes back.
//!
//! # Lifecycle
//!
//! ```text
//! Created --start()--> Running --stop()--> Stopped
//! ```
//!
//! `start()` performs one forced refresh before returning. `stop()` cancels
//! the in-flight refresh and releases the device client.

mod backoff;
mod config;
mod polling;
mod refresh;
mod scheduler;
mod state;

pub use backoff::BackoffPolicy;
pub use config::CoordinatorConfig;
pub use polling::Coordinator;
pub use state::CoordinatorPhase;
