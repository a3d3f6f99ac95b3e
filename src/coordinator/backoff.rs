// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling interval backoff.

use std::time::Duration;

use crate::error::Error;

/// Maps the previous polling interval and a refresh outcome to the next
/// interval.
///
/// A failure doubles the interval up to `max_interval`. A success resets it
/// to `default_interval` at once, whatever the history. There is no jitter
/// and no failure limit: a dead device is polled every `max_interval`
/// forever.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use zuli_lib::BackoffPolicy;
///
/// let policy = BackoffPolicy::default();
/// let mut interval = policy.default_interval();
///
/// interval = policy.next(interval, false);
/// assert_eq!(interval, Duration::from_secs(120));
///
/// interval = policy.next(interval, true);
/// assert_eq!(interval, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    default_interval: Duration,
    max_interval: Duration,
}

impl BackoffPolicy {
    /// Default polling interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
    /// Default upper bound for the polling interval.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(15 * 60);

    /// Creates a policy with the given bounds.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `default_interval` is zero or
    /// `max_interval` is shorter than `default_interval`.
    pub fn new(default_interval: Duration, max_interval: Duration) -> Result<Self, Error> {
        if default_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "default interval must be greater than zero".to_string(),
            ));
        }
        if max_interval < default_interval {
            return Err(Error::InvalidConfig(format!(
                "max interval ({}s) is shorter than default interval ({}s)",
                max_interval.as_secs_f64(),
                default_interval.as_secs_f64()
            )));
        }
        Ok(Self {
            default_interval,
            max_interval,
        })
    }

    /// Interval used after a success.
    #[must_use]
    pub const fn default_interval(&self) -> Duration {
        self.default_interval
    }

    /// Upper bound for the interval.
    #[must_use]
    pub const fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Computes the interval that follows a refresh outcome.
    #[must_use]
    pub fn next(&self, interval: Duration, success: bool) -> Duration {
        if success {
            return self.default_interval;
        }

        interval
            .checked_mul(2)
            .map_or(self.max_interval, |doubled| self.clamp(doubled))
    }

    /// Clamps an interval into `[default_interval, max_interval]`.
    #[must_use]
    pub fn clamp(&self, interval: Duration) -> Duration {
        interval.clamp(self.default_interval, self.max_interval)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            default_interval: Self::DEFAULT_INTERVAL,
            max_interval: Self::MAX_INTERVAL,
        }
    }
}
