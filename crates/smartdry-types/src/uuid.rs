//! Bluetooth UUIDs for SmartDry devices.
//!
//! This module contains all the UUIDs needed to communicate with a SmartDry
//! clothesline controller over Bluetooth Low Energy.

use uuid::{Uuid, uuid};

// --- SmartDry Service UUIDs ---

/// SmartDry custom service exposed by the clothesline controller.
pub const CLOTHESLINE_SERVICE: Uuid = uuid!("0000abcd-0000-1000-8000-00805f9b34fb");

// --- SmartDry Characteristic UUIDs ---

/// Sensor characteristic. Notifies with telemetry packets.
pub const SENSOR_CHARACTERISTIC: Uuid = uuid!("0000abce-0000-1000-8000-00805f9b34fb");

/// Command characteristic. Accepts single-byte motor commands.
pub const COMMAND_CHARACTERISTIC: Uuid = uuid!("0000abcf-0000-1000-8000-00805f9b34fb");

#[cfg(test)]
mod tests {
    use super::*;

    // --- Service UUID tests ---

    #[test]
    fn test_clothesline_service_uuid() {
        let expected = "0000abcd-0000-1000-8000-00805f9b34fb";
        assert_eq!(CLOTHESLINE_SERVICE.to_string(), expected);
    }

    // --- Characteristic UUID tests ---

    #[test]
    fn test_sensor_characteristic_uuid() {
        let expected = "0000abce-0000-1000-8000-00805f9b34fb";
        assert_eq!(SENSOR_CHARACTERISTIC.to_string(), expected);
    }

    #[test]
    fn test_command_characteristic_uuid() {
        let expected = "0000abcf-0000-1000-8000-00805f9b34fb";
        assert_eq!(COMMAND_CHARACTERISTIC.to_string(), expected);
    }

    // --- UUID distinctness tests ---

    #[test]
    fn test_smartdry_uuids_are_distinct() {
        assert_ne!(CLOTHESLINE_SERVICE, SENSOR_CHARACTERISTIC);
        assert_ne!(CLOTHESLINE_SERVICE, COMMAND_CHARACTERISTIC);
        assert_ne!(SENSOR_CHARACTERISTIC, COMMAND_CHARACTERISTIC);
    }

    // --- UUID format validation tests ---

    #[test]
    fn test_smartdry_uuid_prefix() {
        // All SmartDry UUIDs live in the 0000abXX 16-bit alias block
        let smartdry_uuids = [
            CLOTHESLINE_SERVICE,
            SENSOR_CHARACTERISTIC,
            COMMAND_CHARACTERISTIC,
        ];

        for uuid in smartdry_uuids {
            assert!(
                uuid.to_string().starts_with("0000ab"),
                "UUID {} should start with 0000ab",
                uuid
            );
        }
    }

    #[test]
    fn test_smartdry_uuid_base_suffix() {
        // 16-bit aliases share the Bluetooth base UUID tail
        let smartdry_uuids = [
            CLOTHESLINE_SERVICE,
            SENSOR_CHARACTERISTIC,
            COMMAND_CHARACTERISTIC,
        ];

        for uuid in smartdry_uuids {
            assert!(
                uuid.to_string().ends_with("-0000-1000-8000-00805f9b34fb"),
                "UUID {} should use the Bluetooth base UUID",
                uuid
            );
        }
    }
}
