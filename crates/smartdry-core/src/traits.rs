//! Trait abstractions for clothesline device operations.
//!
//! This module provides the [`ClotheslineDevice`] trait that abstracts over
//! real Bluetooth devices and mock devices for testing. The link client
//! runs its whole post-discovery pipeline against this trait, so the same
//! connect, telemetry, and teardown machinery works with or without a
//! radio.

use async_trait::async_trait;

use smartdry_types::Command;

use crate::error::Result;

/// Callback invoked for each telemetry notification.
pub type SensorCallback = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Trait abstracting SmartDry clothesline operations.
///
/// This trait enables writing code that works with both real Bluetooth
/// devices and mock devices for testing. It is the seam between the link
/// client's state machine and the transport.
///
/// # Example
///
/// ```ignore
/// use smartdry_core::{ClotheslineDevice, Result};
///
/// async fn bring_in_the_laundry<D: ClotheslineDevice>(device: &D) -> Result<()> {
///     device.retract().await
/// }
/// ```
#[async_trait]
pub trait ClotheslineDevice: Send + Sync {
    // --- Connection Management ---

    /// Open the low-level channel and resolve the device's profile.
    ///
    /// For BLE devices this covers GATT connect and service discovery.
    /// A no-op when the channel is already open.
    async fn open_channel(&self) -> Result<()>;

    /// Check if the device is connected.
    async fn is_connected(&self) -> bool;

    /// Disconnect from the device.
    async fn disconnect(&self) -> Result<()>;

    // --- Device Identity ---

    /// Get the device name, if available.
    fn name(&self) -> Option<&str>;

    /// Get the device address or identifier.
    ///
    /// On Linux/Windows this is typically the MAC address.
    /// On macOS this is a UUID since MAC addresses are not exposed.
    fn address(&self) -> &str;

    // --- Telemetry ---

    /// Whether the device exposes a resolved command channel.
    async fn has_command_channel(&self) -> bool;

    /// Subscribe to telemetry notifications.
    ///
    /// The callback is invoked once per notification until
    /// [`unsubscribe_sensor`](Self::unsubscribe_sensor) or
    /// [`disconnect`](Self::disconnect) is called.
    async fn subscribe_sensor(&self, callback: SensorCallback) -> Result<()>;

    /// Stop telemetry notifications.
    async fn unsubscribe_sensor(&self) -> Result<()>;

    // --- Motor Control ---

    /// Send a motor command to the clothesline.
    async fn send_command(&self, command: Command) -> Result<()>;

    /// Extend the line.
    async fn extend(&self) -> Result<()> {
        self.send_command(Command::Extend).await
    }

    /// Retract the line.
    async fn retract(&self) -> Result<()> {
        self.send_command(Command::Retract).await
    }
}
