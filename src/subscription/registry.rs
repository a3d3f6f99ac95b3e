// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener registry for refresh notifications.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`SubscriberRegistry`] - Stores listeners and fans out notifications

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::StateSnapshot;

/// Unique identifier for a subscription.
///
/// Returned by [`Coordinator::register_subscriber`](crate::Coordinator::register_subscriber)
/// and used to unregister later. IDs are unique within a coordinator's
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Listener invoked with `(snapshot, last_update_success)`.
pub(crate) type Listener = Arc<dyn Fn(&StateSnapshot, bool) + Send + Sync>;

/// Registry of refresh listeners.
///
/// Listeners are called synchronously, in no particular order, on every
/// refresh completion. The listener set is copied out of the lock before
/// dispatch, so a listener may register or unregister listeners (including
/// itself) while being called. Such changes take effect from the next
/// dispatch.
///
/// # Thread Safety
///
/// The registry is fully thread-safe. Callbacks are wrapped in `Arc` so they
/// can be cloned cheaply.
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<SubscriptionId, Listener>>,
}

impl SubscriberRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a listener.
    pub fn register<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StateSnapshot, bool) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().insert(id, Arc::new(listener));
        id
    }

    /// Removes a listener.
    ///
    /// Returns `true` if the listener was found and removed.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        self.listeners.write().remove(&id).is_some()
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Calls every listener with the given state.
    pub fn dispatch(&self, snapshot: &StateSnapshot, success: bool) {
        let listeners: Vec<Listener> = self.listeners.read().values().cloned().collect();
        for listener in listeners {
            listener(snapshot, success);
        }
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns `true` if there are no registered listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("listener_count", &self.len())
            .finish()
    }
}
