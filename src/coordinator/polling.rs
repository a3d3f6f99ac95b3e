// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling coordinator for one plug.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;

use crate::client::{DeviceClient, DeviceConnector};
use crate::error::{CommandError, Error, RefreshError};
use crate::state::StateSnapshot;
use crate::subscription::SubscriptionId;
use crate::types::{Brightness, DeviceAddress, DeviceMode};

use super::CoordinatorConfig;
use super::refresh::{Shared, await_outcome};
use super::scheduler::run_scheduler;
use super::state::CoordinatorPhase;

/// Polls one plug, caches its state and notifies subscribers.
///
/// The `Coordinator` is a cheap handle: clones share the same state, device
/// client and scheduler. The host application owns it for as long as the
/// device is registered and calls [`stop`](Self::stop) on teardown.
///
/// # Guarantees
///
/// - **Single flight**: at most one refresh runs at a time. Requests made
///   while one is running join it and receive its outcome.
/// - **Bounded**: a refresh that takes longer than the refresh timeout fails
///   with [`RefreshError::Timeout`].
/// - **Backoff**: each failure doubles the polling interval up to the
///   maximum; the next success resets it.
/// - **Serialized access**: refreshes and write commands never talk to the
///   device at the same time. Writes issued during a refresh queue behind it.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use zuli_lib::{Coordinator, CoordinatorConfig};
/// use zuli_lib::client::{SimulatedConnector, SimulatedPlug};
/// use zuli_lib::types::Brightness;
///
/// #[tokio::main]
/// async fn main() -> zuli_lib::Result<()> {
///     let plug = Arc::new(SimulatedPlug::new("C4:BE:84:0A:11:22"));
///     let connector = SimulatedConnector::new().with_plug(plug);
///
///     // Connects, performs the first refresh and starts polling
///     let coordinator =
///         Coordinator::setup(CoordinatorConfig::new("C4:BE:84:0A:11:22"), &connector).await?;
///
///     coordinator.register_subscriber(|snapshot, available| {
///         println!("{:?} (available: {available})", snapshot.brightness());
///     });
///
///     coordinator.turn_on(Brightness::new(75)?).await?;
///     coordinator.request_refresh();
///
///     let (snapshot, available) = coordinator.current_snapshot();
///     println!("cached: {snapshot:?}, available: {available}");
///
///     coordinator.stop().await;
///     Ok(())
/// }
/// ```
pub struct Coordinator<C: DeviceClient> {
    shared: Arc<Shared<C>>,
}

impl<C: DeviceClient> Coordinator<C> {
    /// Creates a coordinator around an already connected client.
    ///
    /// Nothing is polled until [`start`](Self::start) is called.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the configuration is invalid.
    pub fn new(config: CoordinatorConfig, client: C) -> Result<Self, Error> {
        Ok(Self {
            shared: Arc::new(Shared::new(config, client)?),
        })
    }

    /// Registers a device: connects, then [`start`](Self::start)s polling.
    ///
    /// Connection failures are fatal and are not retried; the host decides
    /// whether to try registering again later.
    ///
    /// # Errors
    ///
    /// Returns `Error::Setup` if the device cannot be found or connected,
    /// `Error::InvalidConfig` if the configuration is invalid, or
    /// `Error::NoRuntime` outside a Tokio runtime.
    pub async fn setup<K>(config: CoordinatorConfig, connector: &K) -> Result<Self, Error>
    where
        K: DeviceConnector<Client = C>,
    {
        config.validate()?;
        tracing::debug!(address = %config.address(), "Connecting to device");

        let client = connector.connect(config.address()).await.inspect_err(|error| {
            tracing::error!(address = %config.address(), %error, "Device setup failed");
        })?;

        let coordinator = Self::new(config, client)?;
        coordinator.start().await?;
        Ok(coordinator)
    }

    /// Starts polling.
    ///
    /// Performs one forced refresh before returning, so the cached snapshot
    /// has been attempted by the time dependent subscribers are set up. A
    /// failed first refresh does not fail `start`; it shows up as
    /// `last_update_success == false` and is retried with backoff.
    ///
    /// Calling `start` on a running coordinator does nothing.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoRuntime` outside a Tokio runtime, or
    /// `Error::Refresh(RefreshError::NotRunning)` if the coordinator was
    /// already stopped.
    pub async fn start(&self) -> Result<(), Error> {
        let address = self.shared.config.address();
        {
            let mut state = self.shared.state.lock();
            match state.phase {
                CoordinatorPhase::Created => {}
                CoordinatorPhase::Running => return Ok(()),
                CoordinatorPhase::Stopped => return Err(RefreshError::NotRunning.into()),
            }
            state.runtime = Some(Handle::try_current().map_err(|_| Error::NoRuntime)?);
            state.phase = CoordinatorPhase::Running;
        }

        tracing::info!(%address, name = self.name(), "Starting coordinator");
        match self.request_refresh_and_await().await {
            Ok(_) => tracing::info!(%address, "Initial refresh succeeded"),
            Err(error) => tracing::warn!(%address, %error, "Initial refresh failed"),
        }

        let scheduler = tokio::spawn(run_scheduler(
            Arc::downgrade(&self.shared),
            address.clone(),
            Arc::clone(&self.shared.rearm),
            self.shared.shutdown.subscribe(),
        ));

        let mut state = self.shared.state.lock();
        if state.phase.is_running() {
            state.scheduler = Some(scheduler);
        } else {
            scheduler.abort();
        }
        Ok(())
    }

    /// Tears the coordinator down.
    ///
    /// Cancels any in-flight refresh (its joiners get
    /// [`RefreshError::Cancelled`]), stops the scheduler and releases the
    /// device client. The polling interval is left untouched. Subscribers get
    /// one last notification with `last_update_success == false` and are then
    /// removed.
    ///
    /// Stopping is permanent; calling `stop` again does nothing.
    pub async fn stop(&self) {
        let address = self.shared.config.address();
        let (in_flight, scheduler) = {
            let mut state = self.shared.state.lock();
            if state.phase == CoordinatorPhase::Stopped {
                return;
            }
            state.phase = CoordinatorPhase::Stopped;
            state.runtime = None;
            (state.in_flight.take(), state.scheduler.take())
        };

        self.shared.shutdown.send_replace(true);
        if let Some(scheduler) = scheduler {
            scheduler.abort();
            let _ = scheduler.await;
        }

        if let Some(in_flight) = in_flight {
            in_flight.task.abort();
            // The aborted task drops its future here, releasing the device slot
            let _ = in_flight.task.await;
            tracing::info!(%address, "Cancelled in-flight refresh");
        }

        {
            let _order = self.shared.dispatch.lock();
            let snapshot = {
                let mut state = self.shared.state.lock();
                state.last_update_success = false;
                state.generation += 1;
                state.snapshot
            };
            self.shared.subscribers.dispatch(&snapshot, false);
        }

        self.shared.client.write().take();
        self.shared.subscribers.clear();
        tracing::info!(%address, "Coordinator stopped");
    }

    /// Triggers a refresh without waiting for it.
    ///
    /// Joins the in-flight refresh if there is one. Otherwise starts a new
    /// one right away and resets the timer. Failures are absorbed into the
    /// availability flag. Does nothing unless the coordinator is running.
    ///
    /// May be called from any thread.
    pub fn request_refresh(&self) {
        if let Err(error) = self.shared.begin_refresh() {
            tracing::debug!(
                address = %self.shared.config.address(),
                %error,
                "Ignoring refresh request"
            );
        }
    }

    /// Triggers or joins a refresh and waits for its outcome.
    ///
    /// # Errors
    ///
    /// Returns the refresh failure: [`RefreshError::Timeout`],
    /// [`RefreshError::Device`], [`RefreshError::Cancelled`] if the
    /// coordinator stopped meanwhile, or [`RefreshError::NotRunning`].
    pub async fn request_refresh_and_await(&self) -> Result<StateSnapshot, RefreshError> {
        let outcome = self.shared.begin_refresh()?;
        await_outcome(outcome).await
    }

    /// Returns the cached snapshot and whether the last refresh succeeded.
    ///
    /// Never blocks on I/O and never talks to the device.
    #[must_use]
    pub fn current_snapshot(&self) -> (StateSnapshot, bool) {
        let state = self.shared.state.lock();
        (state.snapshot, state.last_update_success)
    }

    /// Registers a listener called after every refresh completion.
    pub fn register_subscriber<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StateSnapshot, bool) + Send + Sync + 'static,
    {
        self.shared.subscribers.register(listener)
    }

    /// Removes a listener. Returns `false` if it was already removed.
    pub fn unregister_subscriber(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.unregister(id)
    }

    // =========================================================================
    // Write commands
    // =========================================================================

    /// Switches the load on at the given level.
    ///
    /// Callers should [`request_refresh`](Self::request_refresh) once the
    /// command settles, whatever its outcome.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` if the device rejects the command, the link
    /// fails, the command times out or the coordinator is not running.
    pub async fn turn_on(&self, brightness: Brightness) -> Result<(), CommandError> {
        self.shared
            .run_command("turn_on", move |client| async move {
                client.turn_on(brightness).await
            })
            .await
    }

    /// Switches the load off.
    ///
    /// # Errors
    ///
    /// See [`turn_on`](Self::turn_on).
    pub async fn turn_off(&self) -> Result<(), CommandError> {
        self.shared
            .run_command("turn_off", |client| async move { client.turn_off().await })
            .await
    }

    /// Changes the operating mode.
    ///
    /// # Errors
    ///
    /// See [`turn_on`](Self::turn_on).
    pub async fn set_mode(&self, mode: DeviceMode) -> Result<(), CommandError> {
        self.shared
            .run_command("set_mode", move |client| async move {
                client.set_mode(mode).await
            })
            .await
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Returns the device address.
    #[must_use]
    pub fn address(&self) -> &DeviceAddress {
        self.shared.config.address()
    }

    /// Returns the friendly name, or the address if none was configured.
    #[must_use]
    pub fn name(&self) -> &str {
        self.shared.config.display_name()
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> CoordinatorPhase {
        self.shared.state.lock().phase
    }

    /// Returns the current polling interval.
    #[must_use]
    pub fn current_interval(&self) -> Duration {
        self.shared.state.lock().interval
    }

    /// Returns `true` while a refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.shared.state.lock().in_flight.is_some()
    }

    /// Returns when the last successful refresh completed.
    #[must_use]
    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.shared.state.lock().last_success_at
    }

    /// Returns the number of failed refreshes since the last success.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.shared.state.lock().consecutive_failures
    }

    /// Returns the number of refresh outcomes committed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.state.lock().generation
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }
}

impl<C: DeviceClient> Clone for Coordinator<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: DeviceClient> std::fmt::Debug for Coordinator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("address", self.address())
            .field("state", &*self.shared.state.lock())
            .field("subscribers", &self.shared.subscribers)
            .finish_non_exhaustive()
    }
}
