//! Error types for device access

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to a plug
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error talking to an authenticated plug
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Device did not answer in time
    #[error("no answer from {addr} within {timeout:?}")]
    Timeout {
        /// Device address
        addr: IpAddr,
        /// Time waited
        timeout: Duration,
    },

    /// Reply could not be decoded
    #[error("invalid reply from {addr}: {reason}")]
    InvalidReply {
        /// Device address
        addr: IpAddr,
        /// What was wrong with it
        reason: String,
    },

    /// Device reported a non-zero `err_code`
    #[error("device {addr} returned error {code}: {message}")]
    Device {
        /// Device address
        addr: IpAddr,
        /// Reported error code
        code: i64,
        /// Reported message, if any
        message: String,
    },

    /// Handshake proved the device holds different account credentials
    #[error("device {addr} rejected the account credentials")]
    Authentication {
        /// Device address
        addr: IpAddr,
    },

    /// Device has no energy meter
    #[error("device {0} does not support energy metering")]
    NoEnergyMeter(IpAddr),

    /// Missing or invalid settings
    #[error("configuration error: {0}")]
    Config(String),
}

impl DeviceError {
    /// Whether the device itself answered, so another protocol will not do better
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Device { .. } | Self::Authentication { .. } | Self::NoEnergyMeter(_) | Self::Config(_)
        )
    }
}
