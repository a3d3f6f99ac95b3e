// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mutable coordinator state.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::RefreshError;
use crate::state::StateSnapshot;

/// Result of one refresh, shared by every caller that joined it.
pub(crate) type RefreshOutcome = Result<StateSnapshot, RefreshError>;

/// Lifecycle phase of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    /// Constructed, `start()` not called yet.
    Created,
    /// Polling.
    Running,
    /// Torn down. A stopped coordinator cannot be restarted.
    Stopped,
}

impl CoordinatorPhase {
    /// Returns true if the coordinator is polling.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// The refresh currently talking to the device.
pub(crate) struct InFlight {
    /// Resolves to `Some(outcome)` on completion. Closed without a value if
    /// the task was cancelled.
    pub outcome: watch::Receiver<Option<RefreshOutcome>>,
    pub task: JoinHandle<()>,
}

/// Everything the coordinator mutates, guarded by one lock.
pub(crate) struct CoordinatorState {
    pub phase: CoordinatorPhase,
    pub snapshot: StateSnapshot,
    pub last_update_success: bool,
    /// Always within the backoff policy bounds.
    pub interval: Duration,
    pub in_flight: Option<InFlight>,
    pub last_refresh_started: Option<Instant>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    /// Number of committed refresh outcomes.
    pub generation: u64,
    pub runtime: Option<Handle>,
    pub scheduler: Option<JoinHandle<()>>,
}

impl CoordinatorState {
    pub fn new(interval: Duration) -> Self {
        Self {
            phase: CoordinatorPhase::Created,
            snapshot: StateSnapshot::unknown(),
            last_update_success: false,
            interval,
            in_flight: None,
            last_refresh_started: None,
            last_success_at: None,
            consecutive_failures: 0,
            generation: 0,
            runtime: None,
            scheduler: None,
        }
    }

    /// Returns the in-flight refresh, dropping it first if its task died
    /// without completing (a panicking client).
    pub fn live_in_flight(&mut self) -> Option<&InFlight> {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.task.is_finished())
        {
            tracing::warn!("Refresh task ended without reporting an outcome");
            self.in_flight = None;
        }
        self.in_flight.as_ref()
    }
}

impl std::fmt::Debug for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorState")
            .field("phase", &self.phase)
            .field("last_update_success", &self.last_update_success)
            .field("interval", &self.interval)
            .field("refreshing", &self.in_flight.is_some())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_created_and_unknown() {
        let state = CoordinatorState::new(Duration::from_secs(60));

        assert_eq!(state.phase, CoordinatorPhase::Created);
        assert!(state.snapshot.is_unknown());
        assert!(!state.last_update_success);
        assert_eq!(state.interval, Duration::from_secs(60));
        assert!(state.in_flight.is_none());
    }

    #[test]
    fn phase_checks() {
        assert!(CoordinatorPhase::Running.is_running());
        assert!(!CoordinatorPhase::Created.is_running());
        assert!(!CoordinatorPhase::Stopped.is_running());
    }

    #[tokio::test]
    async fn finished_task_is_not_live() {
        let mut state = CoordinatorState::new(Duration::from_secs(60));
        let (_tx, outcome) = watch::channel(None);
        let task = tokio::spawn(async {});
        while !task.is_finished() {
            tokio::task::yield_now().await;
        }
        state.in_flight = Some(InFlight { outcome, task });

        assert!(state.live_in_flight().is_none());
        assert!(state.in_flight.is_none());
    }
}
