//! SmartDry device connection and communication.
//!
//! This module provides the main interface for connecting to and
//! communicating with SmartDry clothesline controllers over Bluetooth
//! Low Energy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ChannelFailureReason, Error, Result};
use crate::scan::{ScanOptions, find_device};
use crate::traits::{ClotheslineDevice, SensorCallback};
use crate::util::{create_identifier, format_peripheral_id};
use smartdry_types::Command;
use smartdry_types::uuids::{CLOTHESLINE_SERVICE, COMMAND_CHARACTERISTIC, SENSOR_CHARACTERISTIC};

/// Represents a connected SmartDry clothesline controller.
///
/// # Note on Clone
///
/// This struct intentionally does not implement `Clone`. A `Device` represents
/// an active BLE connection with associated state (resolved characteristics,
/// notification handlers). Cloning would create ambiguity about connection
/// ownership. If you need to share a device across multiple tasks, wrap it in
/// `Arc<Device>`.
///
/// # Cleanup
///
/// You MUST call [`Device::disconnect`] before dropping the device to properly
/// release BLE resources. If a Device is dropped without calling disconnect,
/// a warning will be logged and cleanup becomes best-effort.
pub struct Device {
    /// The BLE adapter used for connection.
    ///
    /// This field is stored to keep the adapter alive for the lifetime of the
    /// peripheral connection. The peripheral may hold internal references to
    /// the adapter, and dropping the adapter could invalidate the connection.
    #[allow(dead_code)]
    adapter: Adapter,
    /// The underlying BLE peripheral.
    peripheral: Peripheral,
    /// Cached device name.
    name: Option<String>,
    /// Device address or identifier (MAC address on Linux/Windows, UUID on macOS).
    address: String,
    /// Cache of discovered characteristics by UUID for O(1) lookup.
    /// Built after service discovery to avoid searching through services on
    /// each operation.
    characteristics_cache: RwLock<HashMap<Uuid, Characteristic>>,
    /// Handles for spawned notification tasks (for cleanup).
    notification_handles: tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
    /// Whether disconnect has been called (for Drop warning).
    disconnected: AtomicBool,
    /// Connection configuration (timeouts, etc.).
    config: ConnectionConfig,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Exclude internal BLE details (adapter, peripheral, handles, cache)
        // which are not useful for debugging application logic.
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Default timeout for opening the BLE channel.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for subscribing to telemetry notifications.
const DEFAULT_SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for BLE characteristic write operations.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between link-alive checks.
const DEFAULT_LINK_CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Configuration for BLE connection timeouts and behavior.
///
/// Use this to customize timeout values for different environments.
/// Clotheslines live outdoors, often on the far side of an exterior wall,
/// so the defaults are fairly generous.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use smartdry_core::device::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .write_timeout(Duration::from_secs(15));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for opening the BLE channel.
    pub connection_timeout: Duration,
    /// Timeout for service discovery after the channel opens.
    pub discovery_timeout: Duration,
    /// Timeout for subscribing to telemetry notifications.
    pub subscribe_timeout: Duration,
    /// Timeout for BLE write operations.
    pub write_timeout: Duration,
    /// How often the link monitor polls the connection state.
    pub link_check_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            subscribe_timeout: DEFAULT_SUBSCRIBE_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            link_check_interval: DEFAULT_LINK_CHECK_INTERVAL,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config for challenging RF environments.
    ///
    /// Uses longer timeouts to accommodate signal interference, thick
    /// walls, or a clothesline at the edge of radio range.
    pub fn challenging_environment() -> Self {
        Self {
            connection_timeout: Duration::from_secs(25),
            discovery_timeout: Duration::from_secs(15),
            subscribe_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(15),
            link_check_interval: Duration::from_secs(5),
        }
    }

    /// Create a config for fast, reliable environments.
    ///
    /// Uses shorter timeouts for quicker failure detection when the
    /// device is nearby with a strong signal.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(8),
            discovery_timeout: Duration::from_secs(5),
            subscribe_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(5),
            link_check_interval: Duration::from_secs(1),
        }
    }

    /// Set the channel open timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the telemetry subscribe timeout.
    #[must_use]
    pub fn subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the link monitor poll interval.
    #[must_use]
    pub fn link_check_interval(mut self, interval: Duration) -> Self {
        self.link_check_interval = interval;
        self
    }
}

impl Device {
    /// Connect to a SmartDry device by name or MAC address.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use smartdry_core::device::Device;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let device = Device::connect("SmartDry A1B2").await?;
    ///     println!("Connected to {:?}", device);
    ///     Ok(())
    /// }
    /// ```
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn connect(identifier: &str) -> Result<Self> {
        Self::connect_with_config(identifier, ConnectionConfig::default()).await
    }

    /// Connect to a SmartDry device with a custom configuration.
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn connect_with_config(identifier: &str, config: ConnectionConfig) -> Result<Self> {
        let options = ScanOptions::default().all_devices(); // looking for a specific device

        // Try the default scan first, then a longer one bounded by the
        // connection timeout
        let (adapter, peripheral) = match find_device(identifier).await {
            Ok(result) => result,
            Err(_) => {
                let options = options.duration(config.connection_timeout);
                crate::scan::find_device_with_options(identifier, options).await?
            }
        };

        Self::from_peripheral_with_config(adapter, peripheral, config).await
    }

    /// Create a Device from an already-discovered peripheral.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn from_peripheral(adapter: Adapter, peripheral: Peripheral) -> Result<Self> {
        Self::from_peripheral_with_config(adapter, peripheral, ConnectionConfig::default()).await
    }

    /// Create a Device from an already-discovered peripheral with full configuration.
    #[tracing::instrument(level = "info", skip_all, fields(connect_timeout = ?config.connection_timeout))]
    pub async fn from_peripheral_with_config(
        adapter: Adapter,
        peripheral: Peripheral,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let peripheral_id = format_peripheral_id(&peripheral.id());

        // Open the channel with timeout
        info!("Opening channel to clothesline...");
        timeout(config.connection_timeout, peripheral.connect())
            .await
            .map_err(|_| {
                Error::channel_open_failed(Some(peripheral_id.clone()), ChannelFailureReason::Timeout)
            })?
            .map_err(|e| match Error::from(e) {
                // Unclassified stack errors during channel open become
                // channel failures; classified ones keep their meaning
                Error::Bluetooth(inner) => Error::channel_open_failed(
                    Some(peripheral_id.clone()),
                    ChannelFailureReason::BleError(inner.to_string()),
                ),
                classified => classified,
            })?;
        info!("Channel open");

        // From here the channel is open; any failure must close it
        // again, or a single-connection peripheral stays blocked until
        // its own link timeout fires
        let (characteristics_cache, name, address) =
            match Self::resolve_profile(&peripheral, &config, peripheral_id).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    if let Err(cleanup) = peripheral.disconnect().await {
                        debug!(
                            error = %cleanup,
                            "Cleanup disconnect after failed channel setup failed"
                        );
                    }
                    return Err(e);
                }
            };

        Ok(Self {
            adapter,
            peripheral,
            name,
            address,
            characteristics_cache: RwLock::new(characteristics_cache),
            notification_handles: tokio::sync::Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
            config,
        })
    }

    /// Discover services and read device properties over an open channel.
    async fn resolve_profile(
        peripheral: &Peripheral,
        config: &ConnectionConfig,
        peripheral_id: String,
    ) -> Result<(HashMap<Uuid, Characteristic>, Option<String>, String)> {
        // Discover services with timeout
        info!("Discovering services...");
        timeout(config.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", config.discovery_timeout))??;

        let services = peripheral.services();
        debug!("Found {} services", services.len());

        // Build characteristics cache for O(1) lookups
        let mut characteristics_cache = HashMap::new();
        for service in &services {
            debug!("  Service: {}", service.uuid);
            for char in &service.characteristics {
                debug!("    Characteristic: {}", char.uuid);
                characteristics_cache.insert(char.uuid, char.clone());
            }
        }
        debug!(
            "Cached {} characteristics for fast lookup",
            characteristics_cache.len()
        );

        // Get device properties
        let properties = peripheral.properties().await?;
        let name = properties.as_ref().and_then(|p| p.local_name.clone());

        // On macOS the address may be 00:00:00:00:00:00, so fall back to
        // the peripheral ID
        let address = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or(peripheral_id);

        Ok((characteristics_cache, name, address))
    }

    /// Check if the device is connected (queries BLE stack state).
    ///
    /// Note: this only checks the BLE stack's connection state, which may
    /// lag behind reality by a few seconds, especially on macOS.
    pub async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    /// Get the current connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Disconnect from the device.
    ///
    /// This will:
    /// 1. Abort all active notification handlers
    /// 2. Disconnect from the BLE peripheral
    ///
    /// **Important:** You MUST call this method before dropping the Device
    /// to ensure proper cleanup of BLE resources.
    #[tracing::instrument(level = "info", skip(self), fields(device_name = ?self.name))]
    pub async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from device...");
        self.disconnected.store(true, Ordering::SeqCst);

        // Abort all notification handlers
        {
            let mut handles = self.notification_handles.lock().await;
            for handle in handles.drain(..) {
                handle.abort();
            }
        }

        self.peripheral.disconnect().await?;
        Ok(())
    }

    /// Get the device name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the device address or identifier.
    ///
    /// On Linux and Windows, this returns the Bluetooth MAC address (e.g.,
    /// "AA:BB:CC:DD:EE:FF"). On macOS, this returns a UUID identifier since
    /// MAC addresses are not exposed.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Find a characteristic by UUID using the cached lookup table.
    ///
    /// Uses O(1) lookup from the characteristics cache built during service
    /// discovery. Falls back to searching through services if the cache is
    /// empty (shouldn't happen normally, but provides robustness).
    pub(crate) async fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        // Try cache first
        {
            let cache = self.characteristics_cache.read().await;
            if let Some(char) = cache.get(&uuid) {
                return Ok(char.clone());
            }

            // If the cache is populated but the characteristic is not in
            // it, the device does not have it
            if !cache.is_empty() {
                return Err(Error::characteristic_not_found(
                    uuid.to_string(),
                    self.peripheral.services().len(),
                ));
            }
        }

        // Fallback: search services directly
        warn!(
            "Characteristics cache empty, falling back to service search for {}",
            uuid
        );
        let services = self.peripheral.services();
        let service_count = services.len();

        // Try the clothesline service first
        for service in &services {
            if service.uuid == CLOTHESLINE_SERVICE {
                for char in &service.characteristics {
                    if char.uuid == uuid {
                        return Ok(char.clone());
                    }
                }
            }
        }

        // Then search all services
        for service in &services {
            for char in &service.characteristics {
                if char.uuid == uuid {
                    return Ok(char.clone());
                }
            }
        }

        Err(Error::characteristic_not_found(
            uuid.to_string(),
            service_count,
        ))
    }

    /// Send a motor command to the clothesline.
    ///
    /// Prefers an acknowledged write when the firmware's command
    /// characteristic offers one, and falls back to an unacknowledged
    /// write otherwise.
    #[tracing::instrument(level = "debug", skip(self), fields(device_name = ?self.name, command = %command))]
    pub async fn send_command(&self, command: Command) -> Result<()> {
        let characteristic = self.find_characteristic(COMMAND_CHARACTERISTIC).await?;

        let write_type = if characteristic.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };

        let payload = command.encode();
        timeout(
            self.config.write_timeout,
            self.peripheral.write(&characteristic, &payload, write_type),
        )
        .await
        .map_err(|_| {
            Error::timeout(
                format!("send {} command", command),
                self.config.write_timeout,
            )
        })??;

        debug!(write_type = ?write_type, "Command written");
        Ok(())
    }

    /// Subscribe to notifications on a characteristic.
    ///
    /// The callback will be invoked for each notification received.
    /// The notification handler task is tracked and will be aborted when
    /// `disconnect()` is called.
    pub async fn subscribe_to_notifications<F>(&self, uuid: Uuid, callback: F) -> Result<()>
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let characteristic = self.find_characteristic(uuid).await?;

        timeout(
            self.config.subscribe_timeout,
            self.peripheral.subscribe(&characteristic),
        )
        .await
        .map_err(|_| {
            Error::timeout(
                format!("subscribe to {}", uuid),
                self.config.subscribe_timeout,
            )
        })??;

        // Set up notification handler
        let mut stream = self.peripheral.notifications().await?;
        let char_uuid = characteristic.uuid;

        let handle = tokio::spawn(async move {
            use futures::StreamExt;
            while let Some(notification) = stream.next().await {
                if notification.uuid == char_uuid {
                    callback(&notification.value);
                }
            }
        });

        // Store the handle for cleanup on disconnect
        self.notification_handles.lock().await.push(handle);

        Ok(())
    }

    /// Unsubscribe from notifications on a characteristic.
    pub async fn unsubscribe_from_notifications(&self, uuid: Uuid) -> Result<()> {
        let characteristic = self.find_characteristic(uuid).await?;
        self.peripheral.unsubscribe(&characteristic).await?;
        Ok(())
    }
}

// NOTE: Drop performs best-effort cleanup if disconnect() was not called.
// The cleanup is spawned as a background task and may not complete during
// shutdown. For reliable cleanup, callers SHOULD explicitly call
// `device.disconnect().await` before dropping the Device.

impl Drop for Device {
    fn drop(&mut self) {
        if !self.disconnected.load(Ordering::SeqCst) {
            // Mark as disconnected to prevent double-cleanup
            self.disconnected.store(true, Ordering::SeqCst);

            warn!(
                device_name = ?self.name,
                device_address = %self.address,
                "Device dropped without calling disconnect() - performing best-effort cleanup. \
                 For reliable cleanup, call device.disconnect().await before dropping."
            );

            // We can't .await here, so try_lock and abort synchronously
            if let Ok(mut handles) = self.notification_handles.try_lock() {
                for handle in handles.drain(..) {
                    handle.abort();
                }
            }

            // Spawn a best-effort cleanup task for the BLE disconnect.
            // This may fail if the runtime is shutting down.
            let peripheral = self.peripheral.clone();
            let address = self.address.clone();

            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = peripheral.disconnect().await {
                        debug!(
                            device_address = %address,
                            error = %e,
                            "Best-effort disconnect failed (device may already be disconnected)"
                        );
                    } else {
                        debug!(
                            device_address = %address,
                            "Best-effort disconnect completed"
                        );
                    }
                });
            }
        }
    }
}

#[async_trait]
impl ClotheslineDevice for Device {
    // --- Connection Management ---

    async fn open_channel(&self) -> Result<()> {
        // The constructor opens the channel and resolves the profile; a
        // Device that lost its link is not reopened, callers reconnect
        // through a fresh Device
        if Device::is_connected(self).await {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    async fn is_connected(&self) -> bool {
        Device::is_connected(self).await
    }

    async fn disconnect(&self) -> Result<()> {
        Device::disconnect(self).await
    }

    // --- Device Identity ---

    fn name(&self) -> Option<&str> {
        Device::name(self)
    }

    fn address(&self) -> &str {
        Device::address(self)
    }

    // --- Telemetry ---

    async fn has_command_channel(&self) -> bool {
        self.find_characteristic(COMMAND_CHARACTERISTIC).await.is_ok()
    }

    async fn subscribe_sensor(&self, callback: SensorCallback) -> Result<()> {
        self.subscribe_to_notifications(SENSOR_CHARACTERISTIC, callback)
            .await
    }

    async fn unsubscribe_sensor(&self) -> Result<()> {
        self.unsubscribe_from_notifications(SENSOR_CHARACTERISTIC)
            .await
    }

    // --- Motor Control ---

    async fn send_command(&self, command: Command) -> Result<()> {
        Device::send_command(self, command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.connection_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.discovery_timeout, DEFAULT_DISCOVERY_TIMEOUT);
        assert_eq!(config.subscribe_timeout, DEFAULT_SUBSCRIBE_TIMEOUT);
        assert_eq!(config.write_timeout, DEFAULT_WRITE_TIMEOUT);
        assert_eq!(config.link_check_interval, DEFAULT_LINK_CHECK_INTERVAL);
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new()
            .connection_timeout(Duration::from_secs(30))
            .discovery_timeout(Duration::from_secs(20))
            .subscribe_timeout(Duration::from_secs(7))
            .write_timeout(Duration::from_secs(9))
            .link_check_interval(Duration::from_secs(4));

        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.discovery_timeout, Duration::from_secs(20));
        assert_eq!(config.subscribe_timeout, Duration::from_secs(7));
        assert_eq!(config.write_timeout, Duration::from_secs(9));
        assert_eq!(config.link_check_interval, Duration::from_secs(4));
    }

    #[test]
    fn test_connection_config_presets() {
        let defaults = ConnectionConfig::default();

        let challenging = ConnectionConfig::challenging_environment();
        assert!(challenging.connection_timeout > defaults.connection_timeout);
        assert!(challenging.write_timeout > defaults.write_timeout);

        let fast = ConnectionConfig::fast();
        assert!(fast.connection_timeout < defaults.connection_timeout);
        assert!(fast.link_check_interval <= defaults.link_check_interval);
    }
}
