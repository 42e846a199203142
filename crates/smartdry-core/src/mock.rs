//! Mock device implementation for testing.
//!
//! This module provides a mock clothesline that can be used for unit
//! testing without requiring actual BLE hardware.
//!
//! The [`MockDevice`] implements the [`ClotheslineDevice`] trait, allowing
//! it to be used interchangeably with real devices in generic code.
//!
//! # Features
//!
//! - **Command log**: Every motor command is recorded for assertions
//! - **Failure injection**: Set the device to fail operations, permanently
//!   or for a fixed number of attempts
//! - **Latency simulation**: Add artificial delays to simulate slow BLE
//!   responses

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use smartdry_types::Command;

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::traits::{ClotheslineDevice, SensorCallback};

/// A mock SmartDry clothesline for testing.
///
/// Implements the [`ClotheslineDevice`] trait for use in generic code and
/// testing.
///
/// # Example
///
/// ```
/// use smartdry_core::{ClotheslineDevice, MockDevice};
/// use smartdry_types::Command;
///
/// #[tokio::main]
/// async fn main() {
///     let device = MockDevice::new("Test Clothesline");
///     device.connect().await.unwrap();
///
///     device.send_command(Command::Retract).await.unwrap();
///     assert_eq!(device.last_command().await, Some(Command::Retract));
/// }
/// ```
pub struct MockDevice {
    name: String,
    address: String,
    connected: AtomicBool,
    /// Every command accepted by the mock, in send order.
    command_log: Mutex<Vec<Command>>,
    should_fail: AtomicBool,
    fail_message: RwLock<String>,
    /// Simulated send latency in milliseconds (0 = no delay).
    send_latency_ms: AtomicU64,
    /// Simulated connect latency in milliseconds (0 = no delay).
    connect_latency_ms: AtomicU64,
    /// Number of operations to fail before succeeding (0 = always succeed/fail based on should_fail).
    fail_count: AtomicU32,
    /// Current count of failures (decremented on each failure).
    remaining_failures: AtomicU32,
    /// Whether the mock advertises a command channel.
    has_command_channel: AtomicBool,
    /// The subscribed telemetry callback, if any.
    sensor_callback: Mutex<Option<SensorCallback>>,
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockDevice {
    /// Create a new mock device with default values.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: format!("MOCK-{:06X}", rand::random::<u32>() % 0xFFFFFF),
            connected: AtomicBool::new(false),
            command_log: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
            fail_message: RwLock::new("Mock failure".to_string()),
            send_latency_ms: AtomicU64::new(0),
            connect_latency_ms: AtomicU64::new(0),
            fail_count: AtomicU32::new(0),
            remaining_failures: AtomicU32::new(0),
            has_command_channel: AtomicBool::new(true),
            sensor_callback: Mutex::new(None),
        }
    }

    /// Connect to the mock device.
    pub async fn connect(&self) -> Result<()> {
        // Simulate connect latency
        let latency = self.connect_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        // Check for transient failures first
        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::DeviceNotFound(DeviceNotFoundReason::NotFound {
                identifier: self.name.clone(),
            }));
        }

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::DeviceNotFound(DeviceNotFoundReason::NotFound {
                identifier: self.name.clone(),
            }));
        }
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Disconnect from the mock device.
    ///
    /// Also drops the subscribed telemetry callback, mirroring a real
    /// teardown.
    pub async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Relaxed);
        *self.sensor_callback.lock().await = None;
        Ok(())
    }

    /// Simulate a transport-initiated link drop.
    ///
    /// Flips the connected flag without touching the subscription, as if
    /// the device walked out of range; the link monitor is expected to
    /// notice and run the cleanup.
    pub fn drop_link(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    /// Deliver a telemetry packet to the subscribed callback.
    ///
    /// Silently dropped when nothing is subscribed, like a notification
    /// from an unsubscribed characteristic.
    pub async fn push_packet(&self, data: &[u8]) {
        if let Some(callback) = self.sensor_callback.lock().await.as_ref() {
            callback(data);
        }
    }

    /// Whether a telemetry callback is currently subscribed.
    pub async fn is_subscribed(&self) -> bool {
        self.sensor_callback.lock().await.is_some()
    }

    /// Check if connected (sync method for internal use).
    pub fn is_connected_sync(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Send a motor command to the mock.
    ///
    /// The command is appended to the command log on success.
    pub async fn send_command(&self, command: Command) -> Result<()> {
        self.check_connected()?;
        self.check_should_fail().await?;

        self.command_log.lock().await.push(command);
        Ok(())
    }

    fn check_connected(&self) -> Result<()> {
        if !self.connected.load(Ordering::Relaxed) {
            Err(Error::NotConnected)
        } else {
            Ok(())
        }
    }

    async fn check_should_fail(&self) -> Result<()> {
        // Simulate send latency
        let latency = self.send_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        // Check for transient failures first
        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(self.failure().await);
        }

        if self.should_fail.load(Ordering::Relaxed) {
            Err(self.failure().await)
        } else {
            Ok(())
        }
    }

    async fn failure(&self) -> Error {
        Error::Bluetooth(btleplug::Error::Other(
            self.fail_message.read().await.clone().into(),
        ))
    }

    // --- Test control methods ---

    /// All commands the mock has accepted, in send order.
    pub async fn sent_commands(&self) -> Vec<Command> {
        self.command_log.lock().await.clone()
    }

    /// The most recently accepted command, if any.
    pub async fn last_command(&self) -> Option<Command> {
        self.command_log.lock().await.last().copied()
    }

    /// Clear the command log.
    pub async fn clear_sent_commands(&self) {
        self.command_log.lock().await.clear();
    }

    /// Make the device fail on the next operation.
    pub async fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message {
            *self.fail_message.write().await = msg.to_string();
        }
    }

    /// Set simulated send latency.
    ///
    /// Each send operation will be delayed by this duration.
    /// Set to `Duration::ZERO` to disable latency simulation.
    pub fn set_send_latency(&self, latency: Duration) {
        self.send_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Set simulated connect latency.
    ///
    /// Connect operations will be delayed by this duration.
    /// Set to `Duration::ZERO` to disable latency simulation.
    pub fn set_connect_latency(&self, latency: Duration) {
        self.connect_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Configure transient failures.
    ///
    /// The device will fail the next `count` operations, then succeed.
    /// This is useful for testing retry logic.
    ///
    /// # Example
    ///
    /// ```
    /// use smartdry_core::MockDevice;
    ///
    /// let device = MockDevice::new("Test");
    /// // First 3 connect attempts will fail, 4th will succeed
    /// device.set_transient_failures(3);
    /// ```
    pub fn set_transient_failures(&self, count: u32) {
        self.fail_count.store(count, Ordering::Relaxed);
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Reset the transient failure counter.
    pub fn reset_transient_failures(&self) {
        self.remaining_failures
            .store(self.fail_count.load(Ordering::Relaxed), Ordering::Relaxed);
    }

    /// Get the number of remaining transient failures.
    pub fn remaining_failures(&self) -> u32 {
        self.remaining_failures.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ClotheslineDevice for MockDevice {
    // --- Connection Management ---

    async fn open_channel(&self) -> Result<()> {
        MockDevice::connect(self).await
    }

    async fn is_connected(&self) -> bool {
        self.is_connected_sync()
    }

    async fn disconnect(&self) -> Result<()> {
        MockDevice::disconnect(self).await
    }

    // --- Device Identity ---

    fn name(&self) -> Option<&str> {
        Some(MockDevice::name(self))
    }

    fn address(&self) -> &str {
        MockDevice::address(self)
    }

    // --- Telemetry ---

    async fn has_command_channel(&self) -> bool {
        self.has_command_channel.load(Ordering::Relaxed)
    }

    async fn subscribe_sensor(&self, callback: SensorCallback) -> Result<()> {
        self.check_connected()?;
        *self.sensor_callback.lock().await = Some(callback);
        Ok(())
    }

    async fn unsubscribe_sensor(&self) -> Result<()> {
        *self.sensor_callback.lock().await = None;
        Ok(())
    }

    // --- Motor Control ---

    async fn send_command(&self, command: Command) -> Result<()> {
        MockDevice::send_command(self, command).await
    }
}

/// Builder for creating mock devices with custom settings.
#[derive(Debug)]
pub struct MockDeviceBuilder {
    name: String,
    auto_connect: bool,
    has_command_channel: bool,
}

impl Default for MockDeviceBuilder {
    fn default() -> Self {
        Self {
            name: "Mock SmartDry".to_string(),
            auto_connect: true,
            has_command_channel: true,
        }
    }
}

impl MockDeviceBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set whether to auto-connect.
    #[must_use]
    pub fn auto_connect(mut self, auto: bool) -> Self {
        self.auto_connect = auto;
        self
    }

    /// Build a device whose profile lacks the command characteristic.
    ///
    /// For testing how callers handle a clothesline with incompatible
    /// firmware.
    #[must_use]
    pub fn without_command_channel(mut self) -> Self {
        self.has_command_channel = false;
        self
    }

    /// Build the mock device.
    #[must_use]
    pub fn build(self) -> MockDevice {
        let device = MockDevice::new(&self.name);
        device.connected.store(self.auto_connect, Ordering::Relaxed);
        device
            .has_command_channel
            .store(self.has_command_channel, Ordering::Relaxed);
        device
    }
}
