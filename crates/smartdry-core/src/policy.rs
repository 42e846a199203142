//! Clothesline decision policy.
//!
//! Derives a clothesline position from a decoded telemetry packet and the
//! user-configured humidity trigger. The policy is pure so it can be tested
//! exhaustively without any Bluetooth plumbing.

use smartdry_store::ClotheslineState;
use smartdry_types::{Command, SensorPacket};

/// Decide the clothesline state for a fresh telemetry packet.
///
/// Rain takes strict precedence over the humidity threshold: the line is
/// never left out in detected rain, whatever the humidity reads. Without
/// rain, humidity at or above `trigger` percent closes the line and
/// anything below opens it.
///
/// Returns `None` when the packet is dry and carries no humidity sample;
/// no decision is possible and the previous state stands.
pub fn decide_clothesline(packet: &SensorPacket, trigger: u8) -> Option<ClotheslineState> {
    if packet.is_raining {
        return Some(ClotheslineState::Closed);
    }

    match packet.humidity {
        Some(humidity) if humidity >= f32::from(trigger) => Some(ClotheslineState::Closed),
        Some(_) => Some(ClotheslineState::Open),
        None => None,
    }
}

/// The position a successful motor command implies.
///
/// Commands are acknowledged optimistically: the line is assumed to end up
/// where the motor was told to put it, until telemetry says otherwise.
pub fn optimistic_state(command: Command) -> Option<ClotheslineState> {
    match command {
        Command::Extend => Some(ClotheslineState::Open),
        Command::Retract => Some(ClotheslineState::Closed),
        // Future commands carry no position implication until defined
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(humidity: Option<f32>, is_raining: bool) -> SensorPacket {
        SensorPacket {
            temperature: Some(21.0),
            humidity,
            is_raining,
        }
    }

    #[test]
    fn test_rain_closes_regardless_of_humidity() {
        // Humidity far below the trigger must not override rain
        let decision = decide_clothesline(&packet(Some(10.0), true), 70);
        assert_eq!(decision, Some(ClotheslineState::Closed));
    }

    #[test]
    fn test_rain_closes_without_humidity() {
        let decision = decide_clothesline(&packet(None, true), 70);
        assert_eq!(decision, Some(ClotheslineState::Closed));
    }

    #[test]
    fn test_humidity_above_trigger_closes() {
        let decision = decide_clothesline(&packet(Some(75.0), false), 70);
        assert_eq!(decision, Some(ClotheslineState::Closed));
    }

    #[test]
    fn test_humidity_below_trigger_opens() {
        let decision = decide_clothesline(&packet(Some(65.0), false), 70);
        assert_eq!(decision, Some(ClotheslineState::Open));
    }

    #[test]
    fn test_humidity_at_trigger_closes() {
        // The trigger value itself counts as "too humid"
        let decision = decide_clothesline(&packet(Some(70.0), false), 70);
        assert_eq!(decision, Some(ClotheslineState::Closed));
    }

    #[test]
    fn test_no_data_no_decision() {
        let decision = decide_clothesline(&packet(None, false), 70);
        assert_eq!(decision, None);
    }

    #[test]
    fn test_optimistic_states() {
        assert_eq!(
            optimistic_state(Command::Extend),
            Some(ClotheslineState::Open)
        );
        assert_eq!(
            optimistic_state(Command::Retract),
            Some(ClotheslineState::Closed)
        );
    }
}
