//! Core BLE library for SmartDry clothesline controllers.
//!
//! This crate provides Bluetooth Low Energy (BLE) communication with
//! SmartDry motorized clotheslines: discovery, telemetry subscription,
//! and motor control, all published through a shared state store.
//!
//! # Features
//!
//! - **Device discovery**: Scan for nearby clotheslines by name and
//!   advertised service
//! - **Live telemetry**: Temperature, humidity, and rain notifications
//!   decoded and folded into the store
//! - **Derived clothesline state**: Rain and humidity drive an
//!   open/closed decision against the user's trigger
//! - **Motor control**: Extend and retract commands with optimistic
//!   state updates
//! - **Link monitoring**: Unexpected disconnects are detected and the
//!   session is cleaned up
//!
//! # Platform Differences
//!
//! Device identification varies by platform due to differences in BLE
//! implementations:
//!
//! - **macOS**: Devices are identified by a UUID assigned by CoreBluetooth.
//!   This UUID is stable for a given device on a given Mac, but differs
//!   between Macs. The UUID is not the same as the device's MAC address.
//!
//! - **Linux/Windows**: Devices are identified by their Bluetooth MAC
//!   address (e.g., `AA:BB:CC:DD:EE:FF`). This is consistent across
//!   machines.
//!
//! When storing device identifiers for reconnection, be aware that:
//! - On macOS, the UUID may change if Bluetooth is reset or the device is
//!   unpaired
//! - Cross-platform applications should store both the device name and
//!   identifier
//! - The [`Device::address()`] method returns the appropriate identifier
//!   for the platform
//!
//! # Quick Start
//!
//! ```no_run
//! use smartdry_core::{LinkClient, scan};
//! use smartdry_store::StateStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Scan for clotheslines
//!     let devices = scan::scan_for_devices().await?;
//!     println!("Found {} device(s)", devices.len());
//!
//!     // Bind a client to a fresh store and connect
//!     let store = StateStore::shared();
//!     let client = LinkClient::new(store.clone());
//!     client.connect().await?;
//!
//!     // Telemetry lands in the store as it arrives
//!     let snapshot = store.snapshot();
//!     println!("Clothesline is {}", snapshot.clothesline);
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod device;
pub mod error;
pub mod mock;
pub mod policy;
pub mod scan;
pub mod traits;
pub mod util;

// Core exports
pub use client::{LinkClient, apply_telemetry};
pub use device::{ConnectionConfig, Device};
pub use error::{ChannelFailureReason, DeviceNotFoundReason, Error, Result};
pub use mock::{MockDevice, MockDeviceBuilder};
pub use policy::{decide_clothesline, optimistic_state};
pub use scan::{DiscoveredDevice, ScanOptions, scan_for_devices, scan_with_options};
pub use traits::{ClotheslineDevice, SensorCallback};
pub use util::{create_identifier, format_peripheral_id};

/// Type alias for a shared device reference.
///
/// This is the recommended way to share a `Device` across multiple tasks.
/// Since `Device` intentionally does not implement `Clone` (to prevent
/// connection ownership ambiguity), wrapping it in `Arc` is the standard
/// pattern for concurrent access.
pub type SharedDevice = std::sync::Arc<Device>;

// Re-export from smartdry-types
pub use smartdry_types::uuids;
pub use smartdry_types::{Command, SensorPacket, is_smartdry_name};
