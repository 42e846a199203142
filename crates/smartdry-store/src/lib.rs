//! Observable session state for the SmartDry clothesline interface.
//!
//! This crate holds the single source of truth shared by the link
//! client and the presentation layer: connection lifecycle, the latest
//! sensor reading with bounded trend histories, the derived clothesline
//! position, and user configuration.
//!
//! # Features
//!
//! - Atomic snapshot transitions (observers never see partial state)
//! - Watch-based subscriptions for reactive rendering
//! - Bounded FIFO trend histories for temperature and humidity
//! - User configuration that survives disconnects
//!
//! # Example
//!
//! ```
//! use smartdry_store::{ConnectionState, StateStore};
//!
//! let store = StateStore::new();
//! store.set_connection_state(ConnectionState::Connecting);
//!
//! let snapshot = store.snapshot();
//! assert_eq!(snapshot.connection, ConnectionState::Connecting);
//! ```

mod models;
mod store;

pub use models::{
    ClotheslineState, CommandStatus, ConnectionState, DEFAULT_HUMIDITY_TRIGGER, HISTORY_LIMIT,
    SensorReading, StoreSnapshot, TRIGGER_MAX, TRIGGER_MIN,
};
pub use store::{SharedStore, StateStore};
