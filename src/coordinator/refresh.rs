// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Refresh operation, single-flight coalescing and device access.
//!
//! Every device call, read or write, runs while holding the device-access
//! slot (`Shared::slot`). The timeout starts once the slot is held, so time
//! spent queued behind another operation is not charged to the device. A
//! timeout or a cancelled task drops the guard and frees the link for
//! whoever queued behind it.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Notify, watch};
use tokio::time::Instant;

use crate::client::DeviceClient;
use crate::error::{CommandError, DeviceError, Error, RefreshError};
use crate::state::StateSnapshot;
use crate::subscription::SubscriberRegistry;

use super::state::{CoordinatorPhase, CoordinatorState, InFlight, RefreshOutcome};
use super::{BackoffPolicy, CoordinatorConfig};

/// State shared between coordinator handles, the scheduler and refresh tasks.
pub(crate) struct Shared<C> {
    pub config: CoordinatorConfig,
    pub policy: BackoffPolicy,
    /// `None` once the coordinator is stopped.
    pub client: RwLock<Option<Arc<C>>>,
    /// Device-access slot. FIFO, so writes queue behind a running refresh.
    pub slot: tokio::sync::Mutex<()>,
    pub state: Mutex<CoordinatorState>,
    /// Held while committing an outcome and notifying, so listeners see
    /// outcomes in commit order.
    pub dispatch: Mutex<()>,
    pub subscribers: SubscriberRegistry,
    /// Wakes the scheduler to recompute its deadline.
    pub rearm: Arc<Notify>,
    pub shutdown: watch::Sender<bool>,
}

impl<C: DeviceClient> Shared<C> {
    pub fn new(config: CoordinatorConfig, client: C) -> Result<Self, Error> {
        config.validate()?;
        let policy = config.backoff_policy()?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            state: Mutex::new(CoordinatorState::new(policy.default_interval())),
            config,
            policy,
            client: RwLock::new(Some(Arc::new(client))),
            slot: tokio::sync::Mutex::new(()),
            dispatch: Mutex::new(()),
            subscribers: SubscriberRegistry::new(),
            rearm: Arc::new(Notify::new()),
            shutdown,
        })
    }

    /// Starts a refresh, or joins the one already in flight.
    ///
    /// The check and the start happen under the state lock, so two callers
    /// can never both start a refresh.
    pub fn begin_refresh(
        self: &Arc<Self>,
    ) -> Result<watch::Receiver<Option<RefreshOutcome>>, RefreshError> {
        let address = self.config.address();
        let mut state = self.state.lock();

        if state.phase != CoordinatorPhase::Running {
            return Err(RefreshError::NotRunning);
        }
        if let Some(in_flight) = state.live_in_flight() {
            tracing::trace!(%address, "Joining in-flight refresh");
            return Ok(in_flight.outcome.clone());
        }
        let runtime = state.runtime.clone().ok_or(RefreshError::NotRunning)?;

        let (tx, rx) = watch::channel(None);
        let shared = Arc::clone(self);
        let task = runtime.spawn(async move {
            let outcome = shared.run_refresh().await;
            shared.complete_refresh(outcome, &tx);
        });

        tracing::debug!(%address, "Refresh started");
        state.last_refresh_started = Some(Instant::now());
        state.in_flight = Some(InFlight {
            outcome: rx.clone(),
            task,
        });
        drop(state);

        self.rearm.notify_one();
        Ok(rx)
    }

    /// One bounded attempt to read a complete snapshot.
    async fn run_refresh(&self) -> RefreshOutcome {
        let client = self.client.read().clone().ok_or(RefreshError::NotRunning)?;
        let timeout = self.config.refresh_timeout();

        let _slot = self.slot.lock().await;
        match tokio::time::timeout(timeout, read_snapshot(&*client)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RefreshError::Timeout(timeout)),
        }
    }

    /// Commits an outcome, notifies subscribers and releases joiners.
    fn complete_refresh(
        &self,
        outcome: RefreshOutcome,
        tx: &watch::Sender<Option<RefreshOutcome>>,
    ) {
        let address = self.config.address();
        let _order = self.dispatch.lock();

        let (snapshot, success) = {
            let mut state = self.state.lock();
            state.in_flight = None;

            // Teardown raced with completion; stop() owns the final notification
            if state.phase != CoordinatorPhase::Running {
                return;
            }

            state.generation += 1;
            match &outcome {
                Ok(snapshot) => {
                    state.snapshot = *snapshot;
                    state.last_update_success = true;
                    state.last_success_at = Some(Utc::now());
                    state.consecutive_failures = 0;
                    state.interval = self.policy.next(state.interval, true);
                    tracing::debug!(
                        %address,
                        brightness = ?snapshot.brightness(),
                        mode = ?snapshot.mode(),
                        "Refresh succeeded"
                    );
                }
                Err(error) => {
                    state.last_update_success = false;
                    state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                    state.interval = self.policy.next(state.interval, false);
                    tracing::warn!(
                        %address,
                        %error,
                        failures = state.consecutive_failures,
                        next_interval_secs = state.interval.as_secs(),
                        "Refresh failed, backing off"
                    );
                }
            }
            (state.snapshot, state.last_update_success)
        };

        self.subscribers.dispatch(&snapshot, success);
        tx.send_replace(Some(outcome));
        self.rearm.notify_one();
    }

    /// Runs one write command under the device-access slot.
    ///
    /// Queues behind any operation holding the slot; the timeout only covers
    /// the device call itself.
    pub async fn run_command<F, Fut>(
        &self,
        command: &'static str,
        op: F,
    ) -> Result<(), CommandError>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = Result<(), DeviceError>>,
    {
        let address = self.config.address();
        if !self.state.lock().phase.is_running() {
            return Err(CommandError::NotRunning);
        }
        let client = self.client.read().clone().ok_or(CommandError::NotRunning)?;
        let timeout = self.config.refresh_timeout();

        let _slot = self.slot.lock().await;
        tracing::debug!(%address, command, "Sending command");
        let result = tokio::time::timeout(timeout, op(client)).await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => {
                tracing::warn!(%address, command, error = %source, "Command failed");
                Err(CommandError::Device { command, source })
            }
            Err(_) => {
                tracing::warn!(%address, command, "Command timed out");
                Err(CommandError::Timeout {
                    command,
                    after: timeout,
                })
            }
        }
    }
}

/// Reads brightness, mode and power in order. Any failure aborts the rest.
async fn read_snapshot<C: DeviceClient>(client: &C) -> RefreshOutcome {
    let brightness = client.read().await?;
    let mode = client.get_mode().await?;
    let power_reading = client.read_power().await?;

    Ok(StateSnapshot::new(brightness, mode, Some(power_reading)))
}

/// Waits for a refresh started or joined via [`Shared::begin_refresh`].
pub(crate) async fn await_outcome(
    mut outcome: watch::Receiver<Option<RefreshOutcome>>,
) -> RefreshOutcome {
    match outcome.wait_for(Option::is_some).await {
        Ok(value) => (*value).clone().unwrap_or(Err(RefreshError::Cancelled)),
        Err(_) => Err(RefreshError::Cancelled),
    }
}
