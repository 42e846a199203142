//! Example: Scanning for SmartDry Clotheslines
//!
//! This example demonstrates how to scan for SmartDry clothesline
//! controllers using Bluetooth Low Energy. A device counts as a match
//! when it advertises the SmartDry name prefix or the clothesline
//! service.
//!
//! Run with: `cargo run --example scan_devices`

use smartdry_core::scan::{self, ScanOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("Scanning for SmartDry clotheslines...");
    println!();

    // Scan with custom options
    let options = ScanOptions::default()
        .duration_secs(10)
        .filter_smartdry_only(true);

    let devices = scan::scan_with_options(options).await?;

    if devices.is_empty() {
        println!("No SmartDry devices found.");
        println!();
        println!("Make sure:");
        println!("  - Your clothesline controller is powered on");
        println!("  - Bluetooth is enabled on this computer");
        println!("  - The device is within range");
    } else {
        println!("Found {} device(s):", devices.len());
        println!();

        for device in &devices {
            let name = device.name.as_deref().unwrap_or("Unknown");
            let rssi = device
                .rssi
                .map(|r| format!("{} dBm", r))
                .unwrap_or_else(|| "N/A".to_string());

            println!("  {}", name);
            println!("    Identifier: {}", device.identifier);
            println!("    RSSI: {}", rssi);
            println!();
        }
    }

    Ok(())
}
