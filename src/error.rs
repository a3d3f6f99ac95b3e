// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the Zuli library.
//!
//! Failures are split by how they are handled:
//!
//! - [`SetupError`] is fatal to device registration and is never retried by
//!   the coordinator.
//! - [`RefreshError`] is transient. The coordinator absorbs it into the
//!   availability flag and backs off; only
//!   [`request_refresh_and_await`](crate::Coordinator::request_refresh_and_await)
//!   hands it to a caller.
//! - [`CommandError`] is returned to whoever issued a write command.

use std::time::Duration;

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Device registration failed.
    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),

    /// A refresh attempt failed.
    #[error("refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    /// A write command failed.
    #[error("command failed: {0}")]
    Command(#[from] CommandError),

    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Coordinator configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The coordinator was started outside a Tokio runtime.
    #[error("no Tokio runtime available")]
    NoRuntime,
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// An unknown operating mode option was provided.
    #[error("invalid mode: {0}")]
    InvalidMode(String),
}

/// Errors reported by a device client.
///
/// These come from the transport or from the device itself. The coordinator
/// never inspects them beyond wrapping them for diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The wireless link failed (disconnect, GATT error, lost packet).
    #[error("transport error: {0}")]
    Transport(String),

    /// The device answered but refused the operation.
    #[error("device rejected the request: {0}")]
    Rejected(String),

    /// The client is not connected to the device.
    #[error("device is not connected")]
    NotConnected,
}

/// Fatal errors raised while registering a device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// No device is reachable at the configured address.
    #[error("could not find device at {address}")]
    NotFound {
        /// The address that was looked up.
        address: String,
    },

    /// The device was found but the client could not be created.
    #[error("error creating device client for {address}: {source}")]
    Connect {
        /// The address of the device.
        address: String,
        /// The underlying device error.
        #[source]
        source: DeviceError,
    },
}

/// Errors produced by a single refresh attempt.
///
/// Cloneable because one outcome is shared by every caller that joined the
/// same in-flight refresh.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The read sequence did not finish in time.
    #[error("refresh timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// A read failed on the device or the link.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The refresh was cancelled because the coordinator stopped.
    #[error("refresh cancelled")]
    Cancelled,

    /// The coordinator is not running.
    #[error("coordinator is not running")]
    NotRunning,
}

impl RefreshError {
    /// Returns `true` if this failure was a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Errors produced by write commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The device or link failed while executing the command.
    #[error("{command} failed: {source}")]
    Device {
        /// Name of the command.
        command: &'static str,
        /// The underlying device error.
        #[source]
        source: DeviceError,
    },

    /// The command did not finish in time.
    #[error("{command} timed out after {} ms", .after.as_millis())]
    Timeout {
        /// Name of the command.
        command: &'static str,
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The coordinator is not running.
    #[error("coordinator is not running")]
    NotRunning,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
