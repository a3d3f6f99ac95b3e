// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic refresh timer.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::time::Instant;

use crate::client::DeviceClient;
use crate::types::DeviceAddress;

use super::refresh::Shared;
use super::state::{CoordinatorPhase, RefreshOutcome};

/// What the scheduler should wait for next.
enum NextTick {
    /// A refresh is running; wait for it before arming the timer.
    Refreshing(watch::Receiver<Option<RefreshOutcome>>),
    /// Idle; fire at this instant.
    At(Instant),
    Stopped,
}

impl<C: DeviceClient> Shared<C> {
    /// The timer fires `interval` after the start of the latest refresh.
    fn next_tick(&self) -> NextTick {
        let mut state = self.state.lock();
        if state.phase != CoordinatorPhase::Running {
            return NextTick::Stopped;
        }
        if let Some(in_flight) = state.live_in_flight() {
            return NextTick::Refreshing(in_flight.outcome.clone());
        }
        let started = state.last_refresh_started.unwrap_or_else(Instant::now);
        NextTick::At(deadline(started, state.interval))
    }
}

/// Roughly 30 years, used when `started + interval` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `started + interval`, saturating to a far-future instant.
fn deadline(started: Instant, interval: Duration) -> Instant {
    started
        .checked_add(interval)
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE)
}

/// Drives scheduled refreshes until shutdown.
///
/// Holds only a weak reference between ticks, so dropping every coordinator
/// handle also ends the loop.
pub(crate) async fn run_scheduler<C: DeviceClient>(
    shared: Weak<Shared<C>>,
    address: DeviceAddress,
    rearm: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!(%address, "Scheduler started");

    loop {
        let Some(tick) = shared.upgrade().map(|shared| shared.next_tick()) else {
            break;
        };

        match tick {
            NextTick::Stopped => break,
            NextTick::Refreshing(mut outcome) => {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = async { outcome.wait_for(Option::is_some).await.is_ok() } => {}
                }
            }
            NextTick::At(deadline) => {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    () = rearm.notified() => {}
                    () = tokio::time::sleep_until(deadline) => {
                        let Some(shared) = shared.upgrade() else {
                            break;
                        };
                        tracing::debug!(%address, "Scheduled refresh due");
                        if let Err(error) = shared.begin_refresh() {
                            tracing::debug!(%address, %error, "Scheduled refresh not started");
                        }
                    }
                }
            }
        }
    }

    tracing::debug!(%address, "Scheduler stopped");
}
