//! Platform-agnostic types for SmartDry clothesline devices.
//!
//! This crate provides the shared vocabulary used by the state store and
//! the BLE link client: the telemetry codec, motor commands, and the UUID
//! registry for device discovery.
//!
//! # Features
//!
//! - Telemetry packet decoding ([`SensorPacket`])
//! - Motor command encoding ([`Command`])
//! - UUID constants for BLE discovery
//! - Device name matching for scan filtering
//!
//! # Example
//!
//! ```
//! use smartdry_types::{Command, SensorPacket};
//!
//! let mut data = Vec::new();
//! data.extend_from_slice(&21.5f32.to_le_bytes());
//! data.extend_from_slice(&63.2f32.to_le_bytes());
//! data.push(1);
//!
//! let packet = SensorPacket::from_bytes(&data);
//! assert!(packet.is_raining);
//! assert_eq!(Command::Retract.encode(), [0x02]);
//! ```

pub mod types;
pub mod uuid;

pub use types::{
    Command, DEVICE_NAME_PREFIX, HUMIDITY_BYTES, PACKET_BYTES, SensorPacket, TEMPERATURE_BYTES,
    is_smartdry_name,
};
pub use uuid as uuids;

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a full telemetry packet from its decoded fields.
    fn packet_data(temperature: f32, humidity: f32, rain: u8) -> Vec<u8> {
        let mut data = Vec::with_capacity(PACKET_BYTES);
        data.extend_from_slice(&temperature.to_le_bytes());
        data.extend_from_slice(&humidity.to_le_bytes());
        data.push(rain);
        data
    }

    // --- SensorPacket parsing tests ---

    #[test]
    fn test_parse_packet_from_full_bytes() {
        // Construct test bytes:
        // Temperature: 21.5 (0x41AC0000 LE -> [0x00, 0x00, 0xAC, 0x41])
        // Humidity: 63.2 (0x427CCCCD LE -> [0xCD, 0xCC, 0x7C, 0x42])
        // Rain flag: 1 (raining)
        let bytes: [u8; 9] = [
            0x00, 0x00, 0xAC, 0x41, // temperature = 21.5
            0xCD, 0xCC, 0x7C, 0x42, // humidity = 63.2
            1,    // raining
        ];

        let packet = SensorPacket::from_bytes(&bytes);

        let temperature = packet.temperature.unwrap();
        let humidity = packet.humidity.unwrap();
        assert!((temperature - 21.5).abs() < 0.01);
        assert!((humidity - 63.2).abs() < 0.01);
        assert!(packet.is_raining);
    }

    #[test]
    fn test_parse_packet_rain_clear() {
        let packet = SensorPacket::from_bytes(&packet_data(18.0, 45.0, 0));
        assert!(!packet.is_raining);
    }

    #[test]
    fn test_parse_packet_rain_flag_must_be_one() {
        // The firmware writes exactly 1 when raining; any other value is dry
        for flag in [2u8, 0x10, 0xFF] {
            let packet = SensorPacket::from_bytes(&packet_data(18.0, 45.0, flag));
            assert!(!packet.is_raining, "flag {flag} should not read as rain");
        }
    }

    #[test]
    fn test_parse_packet_temperature_only() {
        let bytes = 21.5f32.to_le_bytes();

        let packet = SensorPacket::from_bytes(&bytes);

        assert_eq!(packet.temperature, Some(21.5));
        assert_eq!(packet.humidity, None);
        assert!(!packet.is_raining);
    }

    #[test]
    fn test_parse_packet_without_rain_byte() {
        // 8 bytes: both floats present, rain flag missing
        let data = &packet_data(21.5, 63.2, 1)[..HUMIDITY_BYTES];

        let packet = SensorPacket::from_bytes(data);

        assert!(packet.temperature.is_some());
        assert!(packet.humidity.is_some());
        assert!(!packet.is_raining);
    }

    #[test]
    fn test_parse_packet_truncated_mid_field() {
        // 6 bytes: temperature complete, humidity cut short
        let data = &packet_data(21.5, 63.2, 1)[..6];

        let packet = SensorPacket::from_bytes(data);

        assert_eq!(packet.temperature, Some(21.5));
        assert_eq!(packet.humidity, None);
        assert!(!packet.is_raining);
    }

    #[test]
    fn test_parse_packet_zero_bytes() {
        let packet = SensorPacket::from_bytes(&[]);

        assert_eq!(packet, SensorPacket::default());
        assert!(packet.is_empty());
    }

    #[test]
    fn test_parse_packet_nan_temperature() {
        let packet = SensorPacket::from_bytes(&packet_data(f32::NAN, 63.2, 0));

        assert_eq!(packet.temperature, None);
        assert_eq!(packet.humidity, Some(63.2));
    }

    #[test]
    fn test_parse_packet_infinite_humidity() {
        for garbage in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            let packet = SensorPacket::from_bytes(&packet_data(21.5, garbage, 1));

            assert_eq!(packet.temperature, Some(21.5));
            assert_eq!(packet.humidity, None);
            assert!(packet.is_raining);
        }
    }

    #[test]
    fn test_parse_packet_negative_temperature() {
        let packet = SensorPacket::from_bytes(&packet_data(-3.5, 80.0, 0));

        assert_eq!(packet.temperature, Some(-3.5));
        assert_eq!(packet.humidity, Some(80.0));
    }

    #[test]
    fn test_parse_packet_extra_bytes_ignored() {
        let mut data = packet_data(21.5, 63.2, 1);
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let packet = SensorPacket::from_bytes(&data);

        assert_eq!(packet.temperature, Some(21.5));
        assert_eq!(packet.humidity, Some(63.2));
        assert!(packet.is_raining);
    }

    #[test]
    fn test_packet_is_empty() {
        assert!(SensorPacket::default().is_empty());

        // A rain-only packet still carries information
        let rain_only = SensorPacket::from_bytes(&packet_data(f32::NAN, f32::NAN, 1));
        assert!(!rain_only.is_empty());

        // All-zero floats decode to real values, not absence
        let zeros = SensorPacket::from_bytes(&[0u8; 9]);
        assert_eq!(zeros.temperature, Some(0.0));
        assert!(!zeros.is_empty());
    }

    // --- Command tests ---

    #[test]
    fn test_command_byte_values() {
        assert_eq!(Command::Extend.as_byte(), 0x01);
        assert_eq!(Command::Retract.as_byte(), 0x02);
        assert_eq!(Command::Extend as u8, 0x01);
        assert_eq!(Command::Retract as u8, 0x02);
    }

    #[test]
    fn test_command_encode() {
        assert_eq!(Command::Extend.encode(), [0x01]);
        assert_eq!(Command::Retract.encode(), [0x02]);
    }

    #[test]
    fn test_command_from_byte() {
        assert_eq!(Command::from_byte(0x01), Some(Command::Extend));
        assert_eq!(Command::from_byte(0x02), Some(Command::Retract));
        assert_eq!(Command::from_byte(0x00), None);
        assert_eq!(Command::from_byte(0x03), None);
        assert_eq!(Command::from_byte(0xFF), None);
    }

    #[test]
    fn test_command_round_trip() {
        for command in [Command::Extend, Command::Retract] {
            assert_eq!(Command::from_byte(command.as_byte()), Some(command));
        }
    }

    #[test]
    fn test_command_display() {
        assert_eq!(Command::Extend.to_string(), "extend");
        assert_eq!(Command::Retract.to_string(), "retract");
    }

    #[test]
    fn test_command_copy() {
        let command = Command::Extend;
        let copied = command; // Copy
        assert_eq!(command, copied); // Original still valid
    }

    // --- Device name tests ---

    #[test]
    fn test_device_name_prefix_constant() {
        assert_eq!(DEVICE_NAME_PREFIX, "SmartDry");
    }

    #[test]
    fn test_device_name_prefix_matching() {
        assert!(is_smartdry_name("SmartDry"));
        assert!(is_smartdry_name("SmartDry-A3F2"));
        assert!(is_smartdry_name("SmartDry Backyard"));

        assert!(!is_smartdry_name("smartdry"));
        assert!(!is_smartdry_name("Laundry Hub"));
        assert!(!is_smartdry_name(""));
    }

    // --- Serialization tests ---

    #[cfg(feature = "serde")]
    #[test]
    fn test_packet_serialization() {
        let packet = SensorPacket {
            temperature: Some(21.5),
            humidity: None,
            is_raining: true,
        };

        let json = serde_json::to_string(&packet).unwrap();
        assert!(json.contains("\"temperature\":21.5"));
        assert!(json.contains("\"humidity\":null"));
        assert!(json.contains("\"is_raining\":true"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_packet_deserialization() {
        let json = r#"{"temperature":21.5,"humidity":null,"is_raining":false}"#;

        let packet: SensorPacket = serde_json::from_str(json).unwrap();
        assert_eq!(packet.temperature, Some(21.5));
        assert_eq!(packet.humidity, None);
        assert!(!packet.is_raining);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_command_serialization() {
        assert_eq!(
            serde_json::to_string(&Command::Extend).unwrap(),
            "\"extend\""
        );
        assert_eq!(
            serde_json::to_string(&Command::Retract).unwrap(),
            "\"retract\""
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_command_deserialization() {
        let command: Command = serde_json::from_str("\"retract\"").unwrap();
        assert_eq!(command, Command::Retract);
    }
}
