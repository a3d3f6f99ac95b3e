// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinator configuration.

use std::time::Duration;

use crate::error::Error;
use crate::types::DeviceAddress;

use super::BackoffPolicy;

/// Configuration for one managed plug.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use zuli_lib::CoordinatorConfig;
///
/// // Defaults: poll every 60s, back off to 15 min, 15s refresh timeout
/// let config = CoordinatorConfig::new("c4:be:84:0a:11:22");
/// assert_eq!(config.address().as_str(), "C4:BE:84:0A:11:22");
///
/// let config = CoordinatorConfig::new("c4:be:84:0a:11:22")
///     .with_name("Desk Lamp")
///     .with_default_interval(Duration::from_secs(30))
///     .with_refresh_timeout(Duration::from_secs(10));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    address: DeviceAddress,
    name: Option<String>,
    default_interval: Duration,
    max_interval: Duration,
    refresh_timeout: Duration,
}

impl CoordinatorConfig {
    /// Default timeout for one refresh or write.
    pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

    /// Creates a configuration with default timings.
    #[must_use]
    pub fn new(address: impl Into<DeviceAddress>) -> Self {
        Self {
            address: address.into(),
            name: None,
            default_interval: BackoffPolicy::DEFAULT_INTERVAL,
            max_interval: BackoffPolicy::MAX_INTERVAL,
            refresh_timeout: Self::DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Sets a friendly name for the device.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the polling interval used while the device is healthy.
    #[must_use]
    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    /// Sets the upper bound for the backed-off polling interval.
    #[must_use]
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Sets the timeout for one refresh or write command.
    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Returns the device address.
    #[must_use]
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Returns the friendly name if set, otherwise the address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.address.as_str())
    }

    /// Returns the healthy polling interval.
    #[must_use]
    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    /// Returns the maximum polling interval.
    #[must_use]
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Returns the refresh timeout.
    #[must_use]
    pub fn refresh_timeout(&self) -> Duration {
        self.refresh_timeout
    }

    /// Builds the backoff policy for these timings.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the intervals are inconsistent.
    pub fn backoff_policy(&self) -> Result<BackoffPolicy, Error> {
        BackoffPolicy::new(self.default_interval, self.max_interval)
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the address is blank, the refresh
    /// timeout is zero, or the intervals are inconsistent.
    pub fn validate(&self) -> Result<(), Error> {
        if self.address.is_empty() {
            return Err(Error::InvalidConfig("device address is empty".to_string()));
        }
        if self.refresh_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "refresh timeout must be greater than zero".to_string(),
            ));
        }
        self.backoff_policy().map(|_| ())
    }
}
