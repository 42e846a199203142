//! Example: Watching Live Telemetry
//!
//! This example connects to a SmartDry clothesline, subscribes to its
//! telemetry, and prints every state transition the store publishes:
//! sensor readings, the derived clothesline position, and connection
//! lifecycle changes.
//!
//! Run with: `cargo run --example watch_clothesline [DEVICE_ADDRESS_OR_NAME]`

use std::env;
use std::time::Duration;

use smartdry_core::LinkClient;
use smartdry_store::StateStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let identifier = args.get(1);

    let store = StateStore::shared();
    let client = LinkClient::new(store.clone());
    let mut rx = store.subscribe();

    match identifier {
        Some(id) => {
            println!("Connecting to {}...", id);
            client.connect_to(id).await?;
        }
        None => {
            println!("Connecting to the first clothesline in range...");
            client.connect().await?;
        }
    }

    let name = store.snapshot().device_name.unwrap_or_else(|| "Unknown".to_string());
    println!("Connected to {}", name);
    println!();
    println!("Watching telemetry for 60 seconds (Ctrl+C to stop)...");
    println!();

    let deadline = tokio::time::sleep(Duration::from_secs(60));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Interrupted.");
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();

                let temperature = snapshot
                    .reading
                    .temperature
                    .map(|t| format!("{:.1} °C", t))
                    .unwrap_or_else(|| "--".to_string());
                let humidity = snapshot
                    .reading
                    .humidity
                    .map(|h| format!("{:.1}%", h))
                    .unwrap_or_else(|| "--".to_string());
                let rain = match snapshot.reading.is_raining {
                    Some(true) => "RAIN",
                    Some(false) => "dry",
                    None => "--",
                };

                println!(
                    "[{}] temp {} | humidity {} | {} | line {}",
                    snapshot.connection, temperature, humidity, rain, snapshot.clothesline
                );

                // The link monitor resets the store when the device drops
                if snapshot.connection.is_error()
                    || snapshot.connection == smartdry_store::ConnectionState::Disconnected
                {
                    break;
                }
            }
        }
    }

    println!();
    println!("Final state:");
    println!("{}", serde_json::to_string_pretty(&store.snapshot())?);

    client.disconnect().await?;
    Ok(())
}
