//! Data models for session state.

use core::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use smartdry_types::SensorPacket;

/// Maximum number of samples kept per trend history.
pub const HISTORY_LIMIT: usize = 24;

/// Lowest accepted humidity trigger, in percent.
pub const TRIGGER_MIN: u8 = 30;

/// Highest accepted humidity trigger, in percent.
pub const TRIGGER_MAX: u8 = 90;

/// Humidity trigger in effect before the user configures one, in percent.
pub const DEFAULT_HUMIDITY_TRIGGER: u8 = 70;

/// Lifecycle of the BLE link, as seen by the interface.
///
/// Exactly one variant is active at a time. `Error` carries the
/// user-facing message; entering any other variant discards it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection attempted yet.
    #[default]
    Idle,
    /// Discovery or link negotiation in progress.
    Connecting,
    /// Link up and telemetry subscribed.
    Connected,
    /// Link closed, by the user or by the device.
    Disconnected,
    /// A connect, send, or link failure.
    Error {
        /// Human-readable description shown to the user.
        message: String,
    },
}

impl ConnectionState {
    /// Build the error variant from any message source.
    pub fn error(message: impl Into<String>) -> Self {
        ConnectionState::Error {
            message: message.into(),
        }
    }

    /// Whether the link is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Whether the last operation failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, ConnectionState::Error { .. })
    }

    /// The pending error message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ConnectionState::Error { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Error { message } => write!(f, "error: {message}"),
        }
    }
}

/// Position of the clothesline, as far as the interface can tell.
///
/// Starts `Unknown` on every fresh connection and after reset; becomes
/// concrete on the first rain or humidity decision, or optimistically
/// when a manual command succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClotheslineState {
    /// Line extended, clothes exposed.
    Open,
    /// Line retracted under shelter.
    Closed,
    /// No decision made yet.
    #[default]
    Unknown,
}

impl fmt::Display for ClotheslineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClotheslineState::Open => write!(f, "open"),
            ClotheslineState::Closed => write!(f, "closed"),
            ClotheslineState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Whether a motor command is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    /// No command in flight.
    #[default]
    Idle,
    /// A command write is on the wire.
    Sending,
}

impl CommandStatus {
    /// Whether a command write is on the wire.
    #[must_use]
    pub fn is_sending(&self) -> bool {
        matches!(self, CommandStatus::Sending)
    }
}

/// Latest merged sensor values.
///
/// Each field stays absent until a packet first carries it. Later
/// packets that omit a field leave the stored value in place, so a
/// truncated packet never wipes a good reading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    /// Temperature in Celsius.
    pub temperature: Option<f32>,
    /// Relative humidity percentage.
    pub humidity: Option<f32>,
    /// Device rain flag.
    pub is_raining: Option<bool>,
    /// When the last packet was merged.
    #[serde(with = "time::serde::rfc3339::option")]
    pub observed_at: Option<OffsetDateTime>,
}

impl SensorReading {
    /// Merge a decoded packet into this reading.
    ///
    /// Float fields overwrite only when present in the packet. The rain
    /// flag is always concrete after decoding, so it always overwrites.
    pub fn apply(&mut self, packet: &SensorPacket, observed_at: OffsetDateTime) {
        if packet.temperature.is_some() {
            self.temperature = packet.temperature;
        }
        if packet.humidity.is_some() {
            self.humidity = packet.humidity;
        }
        self.is_raining = Some(packet.is_raining);
        self.observed_at = Some(observed_at);
    }
}

/// One consistent view of the whole session state.
///
/// Published as a unit on every mutation, so observers never see a
/// half-applied transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// BLE link lifecycle.
    pub connection: ConnectionState,
    /// Advertised name of the connected device.
    pub device_name: Option<String>,
    /// Latest merged sensor values.
    pub reading: SensorReading,
    /// Recent temperature samples, oldest first.
    pub temperature_history: Vec<f32>,
    /// Recent humidity samples, oldest first.
    pub humidity_history: Vec<f32>,
    /// Derived or optimistic clothesline position.
    pub clothesline: ClotheslineState,
    /// Humidity percentage at or above which the line should close.
    pub humidity_trigger: u8,
    /// Whether a motor command is in flight.
    pub command_status: CommandStatus,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Idle,
            device_name: None,
            reading: SensorReading::default(),
            temperature_history: Vec::new(),
            humidity_history: Vec::new(),
            clothesline: ClotheslineState::Unknown,
            humidity_trigger: DEFAULT_HUMIDITY_TRIGGER,
            command_status: CommandStatus::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- ConnectionState tests ---

    #[test]
    fn test_connection_state_default() {
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
    }

    #[test]
    fn test_connection_state_error_constructor() {
        let state = ConnectionState::error("device unreachable");
        assert!(state.is_error());
        assert_eq!(state.error_message(), Some("device unreachable"));
    }

    #[test]
    fn test_connection_state_message_only_on_error() {
        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
        ] {
            assert!(!state.is_error());
            assert_eq!(state.error_message(), None);
        }
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Idle.to_string(), "idle");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(
            ConnectionState::error("bluetooth off").to_string(),
            "error: bluetooth off"
        );
    }

    #[test]
    fn test_connection_state_serialization() {
        assert_eq!(
            serde_json::to_string(&ConnectionState::Connecting).unwrap(),
            "\"connecting\""
        );
        let json = serde_json::to_string(&ConnectionState::error("boom")).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("boom"));
    }

    // --- ClotheslineState tests ---

    #[test]
    fn test_clothesline_state_default() {
        assert_eq!(ClotheslineState::default(), ClotheslineState::Unknown);
    }

    #[test]
    fn test_clothesline_state_display() {
        assert_eq!(ClotheslineState::Open.to_string(), "open");
        assert_eq!(ClotheslineState::Closed.to_string(), "closed");
        assert_eq!(ClotheslineState::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_clothesline_state_serialization() {
        assert_eq!(
            serde_json::to_string(&ClotheslineState::Closed).unwrap(),
            "\"closed\""
        );
        let state: ClotheslineState = serde_json::from_str("\"open\"").unwrap();
        assert_eq!(state, ClotheslineState::Open);
    }

    // --- CommandStatus tests ---

    #[test]
    fn test_command_status_default_and_flags() {
        assert_eq!(CommandStatus::default(), CommandStatus::Idle);
        assert!(!CommandStatus::Idle.is_sending());
        assert!(CommandStatus::Sending.is_sending());
    }

    // --- SensorReading tests ---

    #[test]
    fn test_reading_apply_full_packet() {
        let mut reading = SensorReading::default();
        let packet = SensorPacket {
            temperature: Some(21.5),
            humidity: Some(63.2),
            is_raining: true,
        };

        reading.apply(&packet, OffsetDateTime::UNIX_EPOCH);

        assert_eq!(reading.temperature, Some(21.5));
        assert_eq!(reading.humidity, Some(63.2));
        assert_eq!(reading.is_raining, Some(true));
        assert_eq!(reading.observed_at, Some(OffsetDateTime::UNIX_EPOCH));
    }

    #[test]
    fn test_reading_apply_keeps_absent_fields() {
        let mut reading = SensorReading {
            temperature: Some(18.0),
            humidity: Some(55.0),
            is_raining: Some(true),
            observed_at: Some(OffsetDateTime::UNIX_EPOCH),
        };
        // Truncated packet: temperature only, rain byte missing
        let packet = SensorPacket {
            temperature: Some(19.0),
            humidity: None,
            is_raining: false,
        };

        reading.apply(&packet, OffsetDateTime::UNIX_EPOCH);

        assert_eq!(reading.temperature, Some(19.0));
        assert_eq!(reading.humidity, Some(55.0));
        // Rain is concrete in every decoded packet and overwrites
        assert_eq!(reading.is_raining, Some(false));
    }

    // --- StoreSnapshot tests ---

    #[test]
    fn test_snapshot_default() {
        let snapshot = StoreSnapshot::default();

        assert_eq!(snapshot.connection, ConnectionState::Idle);
        assert_eq!(snapshot.device_name, None);
        assert_eq!(snapshot.reading, SensorReading::default());
        assert!(snapshot.temperature_history.is_empty());
        assert!(snapshot.humidity_history.is_empty());
        assert_eq!(snapshot.clothesline, ClotheslineState::Unknown);
        assert_eq!(snapshot.humidity_trigger, DEFAULT_HUMIDITY_TRIGGER);
        assert_eq!(snapshot.command_status, CommandStatus::Idle);
    }

    #[test]
    fn test_snapshot_serialization_roundtrip() {
        let snapshot = StoreSnapshot {
            connection: ConnectionState::Connected,
            device_name: Some("SmartDry-A3F2".to_string()),
            reading: SensorReading {
                temperature: Some(21.5),
                humidity: Some(63.2),
                is_raining: Some(false),
                observed_at: Some(OffsetDateTime::UNIX_EPOCH),
            },
            temperature_history: vec![20.0, 21.5],
            humidity_history: vec![60.0, 63.2],
            clothesline: ClotheslineState::Open,
            humidity_trigger: 75,
            command_status: CommandStatus::Idle,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let deserialized: StoreSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, snapshot);
        assert!(json.contains("SmartDry-A3F2"));
        assert!(json.contains("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn test_trigger_bounds() {
        assert!(TRIGGER_MIN < TRIGGER_MAX);
        assert!((TRIGGER_MIN..=TRIGGER_MAX).contains(&DEFAULT_HUMIDITY_TRIGGER));
    }
}
