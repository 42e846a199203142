//! Core types for SmartDry telemetry and commands.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Name prefix advertised by SmartDry devices.
///
/// Discovery filters on this prefix together with the service UUID in
/// [`crate::uuid::CLOTHESLINE_SERVICE`].
pub const DEVICE_NAME_PREFIX: &str = "SmartDry";

/// Check whether a device name identifies a SmartDry device.
///
/// Matches on the advertised name prefix. The prefix is case-sensitive,
/// matching what the firmware actually advertises.
///
/// # Examples
///
/// ```
/// use smartdry_types::is_smartdry_name;
///
/// assert!(is_smartdry_name("SmartDry"));
/// assert!(is_smartdry_name("SmartDry-A3F2"));
/// assert!(!is_smartdry_name("smartdry"));
/// assert!(!is_smartdry_name("Laundry Hub"));
/// ```
#[must_use]
pub fn is_smartdry_name(name: &str) -> bool {
    name.starts_with(DEVICE_NAME_PREFIX)
}

/// Number of bytes required for the temperature field to be present.
pub const TEMPERATURE_BYTES: usize = 4;

/// Number of bytes required for the humidity field to be present.
pub const HUMIDITY_BYTES: usize = 8;

/// Full telemetry packet length, including the rain flag.
pub const PACKET_BYTES: usize = 9;

/// One decoded telemetry notification from a SmartDry device.
///
/// The device pushes a fixed little-endian packet:
/// - bytes 0-3: temperature (f32 LE, °C)
/// - bytes 4-7: humidity (f32 LE, percent)
/// - byte 8: rain flag (1 = raining, anything else = dry)
///
/// Radio links are noisy; packets arrive truncated or with garbage in the
/// float fields. Decoding therefore never fails: a field whose bytes are
/// missing, or whose decoded value is not finite, is simply absent. The
/// rain flag defaults to "not raining" when byte 8 is missing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorPacket {
    /// Temperature in degrees Celsius, if the field decoded to a finite value.
    pub temperature: Option<f32>,
    /// Relative humidity percentage, if the field decoded to a finite value.
    pub humidity: Option<f32>,
    /// Whether the device reports rain. `false` when byte 8 is absent or
    /// carries any value other than `1`.
    pub is_raining: bool,
}

impl SensorPacket {
    /// Decode a telemetry packet from raw notification bytes.
    ///
    /// Accepts any byte slice, including the empty one. Fields degrade
    /// individually:
    ///
    /// - fewer than [`TEMPERATURE_BYTES`] bytes: temperature absent;
    /// - fewer than [`HUMIDITY_BYTES`] bytes: humidity absent;
    /// - fewer than [`PACKET_BYTES`] bytes: not raining;
    /// - NaN or infinite float fields are normalized to absent.
    ///
    /// Bytes beyond [`PACKET_BYTES`] are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartdry_types::SensorPacket;
    ///
    /// let mut data = Vec::new();
    /// data.extend_from_slice(&21.5f32.to_le_bytes());
    /// data.extend_from_slice(&63.2f32.to_le_bytes());
    /// data.push(0);
    ///
    /// let packet = SensorPacket::from_bytes(&data);
    /// assert_eq!(packet.temperature, Some(21.5));
    /// assert_eq!(packet.humidity, Some(63.2));
    /// assert!(!packet.is_raining);
    /// ```
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Self {
        use bytes::Buf;

        let mut buf = data;

        let temperature = if data.len() >= TEMPERATURE_BYTES {
            finite(buf.get_f32_le())
        } else {
            None
        };

        let humidity = if data.len() >= HUMIDITY_BYTES {
            finite(buf.get_f32_le())
        } else {
            None
        };

        let is_raining = data.len() >= PACKET_BYTES && data[PACKET_BYTES - 1] == 1;

        SensorPacket {
            temperature,
            humidity,
            is_raining,
        }
    }

    /// Whether the packet carries no sensor values at all.
    ///
    /// True when both floats are absent and the rain flag is clear, which
    /// is what an empty or fully garbled buffer decodes to.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none() && !self.is_raining
    }
}

/// Normalize a decoded float: NaN and infinities mean the field is absent.
fn finite(value: f32) -> Option<f32> {
    value.is_finite().then_some(value)
}

/// Actuation command for the clothesline motor.
///
/// The wire format is a single byte written to the command
/// characteristic. Future firmware revisions may add further commands,
/// hence `#[non_exhaustive]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
#[repr(u8)]
pub enum Command {
    /// Extend the clothesline (line out, drying).
    Extend = 0x01,
    /// Retract the clothesline (line in, sheltered).
    Retract = 0x02,
}

impl Command {
    /// The command's wire byte.
    #[must_use]
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Encode the command as its single-byte wire payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartdry_types::Command;
    ///
    /// assert_eq!(Command::Extend.encode(), [0x01]);
    /// assert_eq!(Command::Retract.encode(), [0x02]);
    /// ```
    #[must_use]
    pub fn encode(&self) -> [u8; 1] {
        [self.as_byte()]
    }

    /// Decode a command byte, if it is one of the known values.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartdry_types::Command;
    ///
    /// assert_eq!(Command::from_byte(0x01), Some(Command::Extend));
    /// assert_eq!(Command::from_byte(0x02), Some(Command::Retract));
    /// assert_eq!(Command::from_byte(0x00), None);
    /// ```
    #[must_use]
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Command::Extend),
            0x02 => Some(Command::Retract),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Extend => write!(f, "extend"),
            Command::Retract => write!(f, "retract"),
        }
    }
}
