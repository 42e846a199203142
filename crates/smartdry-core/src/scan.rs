//! Device discovery and scanning.
//!
//! This module provides functionality to scan for SmartDry clothesline
//! controllers using Bluetooth Low Energy.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::util::{create_identifier, format_peripheral_id};
use smartdry_types::is_smartdry_name;
use smartdry_types::uuids::CLOTHESLINE_SERVICE;

/// Information about a discovered SmartDry device.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// The device name (e.g., "SmartDry A1B2").
    pub name: Option<String>,
    /// The peripheral ID for connecting.
    pub id: PeripheralId,
    /// The BLE address as a string (may be zeros on macOS, use `id` instead).
    pub address: String,
    /// A connection identifier (peripheral ID on macOS, address on other platforms).
    pub identifier: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Whether the device advertises as a SmartDry clothesline.
    pub is_smartdry: bool,
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Only return devices that appear to be SmartDry clotheslines.
    pub filter_smartdry_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            filter_smartdry_only: true,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    /// Set whether to filter for SmartDry devices only.
    pub fn filter_smartdry_only(mut self, filter: bool) -> Self {
        self.filter_smartdry_only = filter;
        self
    }

    /// Scan for all BLE devices, not just SmartDry.
    pub fn all_devices(self) -> Self {
        self.filter_smartdry_only(false)
    }
}

/// Get the first available Bluetooth adapter.
///
/// Every failure here means Bluetooth itself cannot be used, so all
/// errors surface as [`Error::TransportUnavailable`].
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new()
        .await
        .map_err(|e| Error::transport_unavailable(e.to_string()))?;
    let adapters = manager
        .adapters()
        .await
        .map_err(|e| Error::transport_unavailable(e.to_string()))?;

    adapters
        .into_iter()
        .next()
        .ok_or_else(|| Error::transport_unavailable("no Bluetooth adapter available"))
}

/// Scan for SmartDry devices in range.
///
/// Returns a list of discovered devices, or an error if the scan failed.
/// An empty list indicates no devices were found (not an error).
///
/// # Errors
///
/// Returns an error if:
/// - No Bluetooth adapter is available
/// - Bluetooth is not enabled
/// - The scan could not be started or stopped
pub async fn scan_for_devices() -> Result<Vec<DiscoveredDevice>> {
    scan_with_options(ScanOptions::default()).await
}

/// Scan for devices with custom options.
pub async fn scan_with_options(options: ScanOptions) -> Result<Vec<DiscoveredDevice>> {
    let adapter = get_adapter().await?;
    scan_with_adapter(&adapter, options).await
}

/// Scan for devices using a specific adapter.
pub async fn scan_with_adapter(
    adapter: &Adapter,
    options: ScanOptions,
) -> Result<Vec<DiscoveredDevice>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let peripherals = adapter.peripherals().await?;
    let mut discovered = Vec::new();

    for peripheral in peripherals {
        match process_peripheral(&peripheral, options.filter_smartdry_only).await {
            Ok(Some(device)) => {
                info!("Found SmartDry device: {:?}", device.name);
                discovered.push(device);
            }
            Ok(None) => {
                // Not a SmartDry device or filtered out
            }
            Err(e) => {
                debug!("Error processing peripheral: {}", e);
            }
        }
    }

    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

/// Process a peripheral and determine if it's a SmartDry device.
async fn process_peripheral(
    peripheral: &Peripheral,
    filter_smartdry_only: bool,
) -> Result<Option<DiscoveredDevice>> {
    let properties = peripheral.properties().await?;
    let properties = match properties {
        Some(p) => p,
        None => return Ok(None),
    };

    let id = peripheral.id();
    let address = properties.address.to_string();
    let name = properties.local_name.clone();
    let rssi = properties.rssi;

    let is_smartdry = is_smartdry_device(&properties);

    if filter_smartdry_only && !is_smartdry {
        return Ok(None);
    }

    // Use peripheral ID string on macOS (where address is 00:00:00:00:00:00),
    // the address everywhere else
    let identifier = create_identifier(&address, &id);

    Ok(Some(DiscoveredDevice {
        name,
        id,
        address,
        identifier,
        rssi,
        is_smartdry,
    }))
}

/// Check if a peripheral is a SmartDry device based on its properties.
///
/// A clothesline advertises either its name (prefixed "SmartDry") or the
/// clothesline service UUID, depending on firmware. Either is accepted.
fn is_smartdry_device(properties: &btleplug::api::PeripheralProperties) -> bool {
    if let Some(name) = &properties.local_name
        && is_smartdry_name(name)
    {
        return true;
    }

    // Check service data keys for the clothesline service
    if properties.service_data.contains_key(&CLOTHESLINE_SERVICE) {
        return true;
    }

    // Check advertised services
    properties
        .services
        .iter()
        .any(|uuid| *uuid == CLOTHESLINE_SERVICE)
}

/// Find a specific device by name or address.
pub async fn find_device(identifier: &str) -> Result<(Adapter, Peripheral)> {
    find_device_with_options(identifier, ScanOptions::default()).await
}

/// Find a specific device by name or address with custom options.
pub async fn find_device_with_options(
    identifier: &str,
    options: ScanOptions,
) -> Result<(Adapter, Peripheral)> {
    let adapter = get_adapter().await?;
    let peripheral = find_device_with_adapter(&adapter, identifier, options).await?;
    Ok((adapter, peripheral))
}

/// Find a specific device using an already-acquired adapter.
///
/// This function uses a retry strategy to improve reliability:
/// 1. First checks if the device is already known (cached from previous scans)
/// 2. Performs up to 3 scan attempts with increasing durations
///
/// This helps with BLE reliability issues where devices may not appear
/// on every scan due to advertisement timing.
pub async fn find_device_with_adapter(
    adapter: &Adapter,
    identifier: &str,
    options: ScanOptions,
) -> Result<Peripheral> {
    let identifier_lower = identifier.to_lowercase();

    info!("Looking for device: {}", identifier);

    // Check if the device is already known, no scan needed
    if let Some(peripheral) = find_peripheral_by_identifier(adapter, &identifier_lower).await? {
        info!("Found device in cache (no scan needed)");
        return Ok(peripheral);
    }

    // BLE advertisements can be missed due to timing, so scan multiple
    // times with increasing durations
    let max_attempts: u32 = 3;
    let base_duration = options.duration.as_millis() as u64 / 2;
    let base_duration = Duration::from_millis(base_duration.max(2000)); // At least 2 seconds

    for attempt in 1..=max_attempts {
        let scan_duration = base_duration * attempt;

        info!(
            "Scan attempt {}/{} ({}s)...",
            attempt,
            max_attempts,
            scan_duration.as_secs()
        );

        adapter.start_scan(ScanFilter::default()).await?;
        sleep(scan_duration).await;
        adapter.stop_scan().await?;

        if let Some(peripheral) = find_peripheral_by_identifier(adapter, &identifier_lower).await? {
            info!("Found device on attempt {}", attempt);
            return Ok(peripheral);
        }

        if attempt < max_attempts {
            warn!("Device not found, retrying...");
        }
    }

    warn!(
        "Device not found after {} attempts: {}",
        max_attempts, identifier
    );
    Err(Error::device_not_found(identifier))
}

/// Search through known peripherals to find one matching the identifier.
async fn find_peripheral_by_identifier(
    adapter: &Adapter,
    identifier_lower: &str,
) -> Result<Option<Peripheral>> {
    let peripherals = adapter.peripherals().await?;

    for peripheral in peripherals {
        if let Ok(Some(props)) = peripheral.properties().await {
            let address = props.address.to_string().to_lowercase();
            let peripheral_id = format_peripheral_id(&peripheral.id()).to_lowercase();

            // Peripheral ID match (macOS uses UUIDs)
            if peripheral_id.contains(identifier_lower) {
                debug!("Matched by peripheral ID: {}", peripheral_id);
                return Ok(Some(peripheral));
            }

            // Address match (Linux/Windows use MAC addresses)
            if address != "00:00:00:00:00:00"
                && (address == identifier_lower
                    || address.replace(':', "") == identifier_lower.replace(':', ""))
            {
                debug!("Matched by address: {}", address);
                return Ok(Some(peripheral));
            }

            // Name match (partial match supported)
            if let Some(name) = &props.local_name
                && name.to_lowercase().contains(identifier_lower)
            {
                debug!("Matched by name: {}", name);
                return Ok(Some(peripheral));
            }
        }
    }

    Ok(None)
}
