//! Error types for smartdry-core.
//!
//! This module defines all error types that can occur when talking to a
//! SmartDry clothesline controller over Bluetooth Low Energy.
//!
//! # Recovery Guide
//!
//! Different errors call for different handling. The table below summarizes
//! the strategy for each error type.
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::TransportUnavailable`] | Prompt user, then retry | Bluetooth is off or no adapter is present |
//! | [`Error::UnsupportedContext`] | Do not retry | Platform refuses BLE access; needs user/system action |
//! | [`Error::Cancelled`] | Do not retry | Connection attempt was intentionally abandoned |
//! | [`Error::DeviceNotFound`] | Re-scan | Device powered off, out of range, or wrong name |
//! | [`Error::NotConnected`] | Reconnect | Link was lost |
//! | [`Error::ChannelOpenFailed`] | Retry with backoff | Device may be temporarily busy |
//! | [`Error::CharacteristicNotFound`] | Do not retry | Firmware incompatibility |
//! | [`Error::CommandChannelUnavailable`] | Reconnect | Command channel was never resolved or went away |
//! | [`Error::LinkBusy`] | Wait and retry | Another link operation is still in flight |
//! | [`Error::Timeout`] | Retry (2-3 times) | Transient BLE congestion |
//! | [`Error::Bluetooth`] | Retry, then reconnect | May be transient or connection lost |
//!
//! # Store Reporting
//!
//! [`LinkClient`](crate::LinkClient) publishes failures to the state store by
//! rendering the error's `Display` output, so every message here is written to
//! be shown to an end user as-is.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when communicating with SmartDry devices.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error with no more specific classification.
    ///
    /// The underlying stack's message is passed through unchanged.
    #[error("Bluetooth error: {0}")]
    Bluetooth(btleplug::Error),

    /// No usable Bluetooth adapter on this system, or Bluetooth is powered off.
    #[error("Bluetooth unavailable: {reason}")]
    TransportUnavailable {
        /// Description of why the transport cannot be used.
        reason: String,
    },

    /// The platform refused Bluetooth access (missing permission, restricted
    /// execution context).
    #[error("Bluetooth not permitted here: {reason}")]
    UnsupportedContext {
        /// Description of the restriction.
        reason: String,
    },

    /// Connection attempt was cancelled before it completed.
    #[error("Connection attempt cancelled")]
    Cancelled,

    /// Device not found during scan or connection.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation attempted while not connected to a device.
    #[error("Not connected to device")]
    NotConnected,

    /// The device was discovered but its channel could not be opened.
    #[error("Failed to open device channel: {reason}")]
    ChannelOpenFailed {
        /// The device identifier that failed, if known.
        device_id: Option<String>,
        /// The structured reason for the failure.
        reason: ChannelFailureReason,
    },

    /// Required BLE characteristic not found on the device.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// A command was issued but the command channel is not available.
    #[error("Command channel unavailable; connect before sending commands")]
    CommandChannelUnavailable,

    /// Another link operation (connect, disconnect, send) is still running.
    #[error("Link is busy with another operation")]
    LinkBusy,

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },
}

/// Structured reasons for channel-open failures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChannelFailureReason {
    /// Device rejected the connection.
    Rejected,
    /// Channel setup timed out.
    Timeout,
    /// Generic BLE error during setup.
    BleError(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ChannelFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected => write!(f, "connection rejected by device"),
            Self::Timeout => write!(f, "channel setup timed out"),
            Self::BleError(msg) => write!(f, "BLE error: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Reason why a device was not found.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// No devices found during scan.
    NoDevicesInRange,
    /// Device with specified name/address not found.
    NotFound {
        /// The identifier that was searched for.
        identifier: String,
    },
    /// Scan timed out before finding the device.
    ScanTimeout {
        /// How long the scan ran.
        duration: Duration,
    },
    /// A previously known device stopped responding (powered off or left range).
    Vanished,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDevicesInRange => write!(f, "no devices in range"),
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::ScanTimeout { duration } => write!(f, "scan timed out after {:?}", duration),
            Self::Vanished => write!(f, "device no longer reachable"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a transport unavailable error.
    pub fn transport_unavailable(reason: impl Into<String>) -> Self {
        Self::TransportUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an unsupported context error.
    pub fn unsupported_context(reason: impl Into<String>) -> Self {
        Self::UnsupportedContext {
            reason: reason.into(),
        }
    }

    /// Create a channel open failure with structured reason.
    pub fn channel_open_failed(device_id: Option<String>, reason: ChannelFailureReason) -> Self {
        Self::ChannelOpenFailed { device_id, reason }
    }
}

impl From<btleplug::Error> for Error {
    fn from(err: btleplug::Error) -> Self {
        match err {
            btleplug::Error::PermissionDenied => {
                Error::unsupported_context("permission denied")
            }
            btleplug::Error::NotSupported(feature) => {
                Error::unsupported_context(format!("not supported on this platform: {}", feature))
            }
            btleplug::Error::NotConnected => Error::NotConnected,
            btleplug::Error::DeviceNotFound => {
                Error::DeviceNotFound(DeviceNotFoundReason::Vanished)
            }
            btleplug::Error::TimedOut(duration) => Error::Timeout {
                operation: "Bluetooth operation".to_string(),
                duration,
            },
            // Everything else passes through with its original message
            other => Error::Bluetooth(other),
        }
    }
}

/// Result type alias using smartdry-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::device_not_found("SmartDry A1B2");
        assert!(err.to_string().contains("SmartDry A1B2"));

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to device");

        let err = Error::characteristic_not_found("0000abce", 3);
        assert!(err.to_string().contains("0000abce"));
        assert!(err.to_string().contains("3 services"));

        let err = Error::timeout("subscribe to telemetry", Duration::from_secs(10));
        assert!(err.to_string().contains("subscribe to telemetry"));
        assert!(err.to_string().contains("10s"));

        let err = Error::CommandChannelUnavailable;
        assert!(err.to_string().contains("connect before sending"));
    }

    #[test]
    fn test_error_debug() {
        let err = Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange);
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("DeviceNotFound"));
    }

    #[test]
    fn test_device_not_found_reasons() {
        let err = Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange);
        assert!(err.to_string().contains("no devices in range"));

        let err = Error::DeviceNotFound(DeviceNotFoundReason::ScanTimeout {
            duration: Duration::from_secs(30),
        });
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_channel_failure_reasons() {
        let err = Error::channel_open_failed(
            Some("AA:BB:CC:DD:EE:FF".to_string()),
            ChannelFailureReason::Rejected,
        );
        assert!(err.to_string().contains("rejected"));

        let err = Error::channel_open_failed(None, ChannelFailureReason::Timeout);
        assert!(err.to_string().contains("timed out"));

        let err =
            Error::channel_open_failed(None, ChannelFailureReason::BleError("GATT busy".into()));
        assert!(err.to_string().contains("GATT busy"));
    }

    #[test]
    fn test_btleplug_error_classification() {
        let err: Error = btleplug::Error::PermissionDenied.into();
        assert!(matches!(err, Error::UnsupportedContext { .. }));

        let err: Error = btleplug::Error::NotConnected.into();
        assert!(matches!(err, Error::NotConnected));

        let err: Error = btleplug::Error::DeviceNotFound.into();
        assert!(matches!(
            err,
            Error::DeviceNotFound(DeviceNotFoundReason::Vanished)
        ));
        assert!(err.to_string().contains("no longer reachable"));

        let err: Error = btleplug::Error::TimedOut(Duration::from_secs(5)).into();
        assert!(matches!(err, Error::Timeout { .. }));

        let err: Error = btleplug::Error::RuntimeError("runtime gone".to_string()).into();
        assert!(matches!(err, Error::Bluetooth(_)));
        assert!(err.to_string().contains("runtime gone"));
    }

    #[test]
    fn test_messages_are_user_presentable() {
        // Store error messages come straight from Display, so none of them
        // should leak Debug formatting of the whole enum.
        let errors = [
            Error::transport_unavailable("no adapter found"),
            Error::unsupported_context("Bluetooth permission denied"),
            Error::Cancelled,
            Error::CommandChannelUnavailable,
            Error::LinkBusy,
        ];
        for err in errors {
            let msg = err.to_string();
            assert!(!msg.is_empty());
            assert!(!msg.contains("Error::"));
        }
    }
}
