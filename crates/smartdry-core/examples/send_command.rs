//! Example: Sending Motor Commands
//!
//! This example connects to a SmartDry clothesline and sends a single
//! extend or retract command, then shows the optimistic clothesline
//! state the store derives from the successful send.
//!
//! Run with: `cargo run --example send_command -- <extend|retract> [DEVICE_ADDRESS_OR_NAME]`

use std::env;

use smartdry_core::LinkClient;
use smartdry_store::StateStore;
use smartdry_types::Command;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let command = match args.get(1).map(String::as_str) {
        Some("extend") => Command::Extend,
        Some("retract") => Command::Retract,
        _ => {
            eprintln!("Usage: {} <extend|retract> [DEVICE_ADDRESS_OR_NAME]", args[0]);
            eprintln!();
            eprintln!("Example:");
            eprintln!("  {} retract", args[0]);
            eprintln!("  {} extend \"SmartDry A1B2\"", args[0]);
            std::process::exit(1);
        }
    };

    let store = StateStore::shared();
    let client = LinkClient::new(store.clone());

    match args.get(2) {
        Some(id) => {
            println!("Connecting to {}...", id);
            client.connect_to(id).await?;
        }
        None => {
            println!("Connecting to the first clothesline in range...");
            client.connect().await?;
        }
    }
    println!("Connected!");
    println!();

    println!("Sending {} command...", command);
    client.send_command(command).await?;

    let snapshot = store.snapshot();
    println!("Command sent. Clothesline is now {} (optimistic).", snapshot.clothesline);

    client.disconnect().await?;
    println!();
    println!("Disconnected.");

    Ok(())
}
