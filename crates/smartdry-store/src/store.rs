//! Main store implementation.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use smartdry_types::SensorPacket;

use crate::models::{
    ClotheslineState, CommandStatus, ConnectionState, HISTORY_LIMIT, SensorReading, StoreSnapshot,
    TRIGGER_MAX, TRIGGER_MIN,
};

/// Single source of truth for the interface's session state.
///
/// Every mutation goes through a setter that rewrites the snapshot in
/// one step and wakes all subscribers, so readers always observe a
/// complete transition. Readers take whole [`StoreSnapshot`] values,
/// never references into the store.
///
/// Setters are synchronous and total; they can be called from any task
/// or thread, including notification callbacks.
#[derive(Debug)]
pub struct StateStore {
    tx: watch::Sender<StoreSnapshot>,
}

/// Shared handle to a [`StateStore`].
pub type SharedStore = Arc<StateStore>;

impl StateStore {
    /// Create a store holding default state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StoreSnapshot::default());
        Self { tx }
    }

    /// Create a store already wrapped for sharing across tasks.
    #[must_use]
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }

    // === Readers ===

    /// Current state as one consistent snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.tx.borrow().clone()
    }

    /// Subscribe to state changes.
    ///
    /// The receiver sees every snapshot published after this call; pair
    /// `changed().await` with `borrow_and_update()` to consume them.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.tx.subscribe()
    }

    /// Current link lifecycle state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.tx.borrow().connection.clone()
    }

    /// Current clothesline position.
    #[must_use]
    pub fn clothesline_state(&self) -> ClotheslineState {
        self.tx.borrow().clothesline
    }

    /// Current auto-close humidity trigger.
    #[must_use]
    pub fn humidity_trigger(&self) -> u8 {
        self.tx.borrow().humidity_trigger
    }

    // === Setters ===

    /// Set the link lifecycle state.
    ///
    /// Entering [`ConnectionState::Error`] records its message; entering
    /// any other state discards whatever message was pending.
    pub fn set_connection_state(&self, state: ConnectionState) {
        debug!(state = %state, "connection state change");
        self.tx.send_modify(|snapshot| snapshot.connection = state);
    }

    /// Merge one decoded packet into the reading and its histories.
    ///
    /// Present float fields overwrite the reading and append to their
    /// trend history; absent fields leave both untouched. Stamps the
    /// observation time with the current wall clock.
    pub fn set_sensor_data(&self, packet: SensorPacket) {
        trace!(?packet, "merging sensor packet");
        let now = OffsetDateTime::now_utc();
        self.tx.send_modify(|snapshot| {
            snapshot.reading.apply(&packet, now);
            if let Some(temperature) = packet.temperature {
                push_bounded(&mut snapshot.temperature_history, temperature);
            }
            if let Some(humidity) = packet.humidity {
                push_bounded(&mut snapshot.humidity_history, humidity);
            }
        });
    }

    /// Set the derived or optimistic clothesline position.
    pub fn set_clothesline_state(&self, state: ClotheslineState) {
        self.tx.send_modify(|snapshot| snapshot.clothesline = state);
    }

    /// Set whether a motor command is in flight.
    pub fn set_command_status(&self, status: CommandStatus) {
        self.tx.send_modify(|snapshot| snapshot.command_status = status);
    }

    /// Set or clear the connected device's advertised name.
    pub fn set_device_name(&self, name: Option<String>) {
        self.tx.send_modify(|snapshot| snapshot.device_name = name);
    }

    /// Set the auto-close humidity trigger.
    ///
    /// Values outside [`TRIGGER_MIN`]..=[`TRIGGER_MAX`] are clamped to
    /// the nearest bound rather than rejected, so a misbehaving input
    /// surface cannot push the trigger out of range.
    pub fn set_humidity_trigger(&self, value: u8) {
        let clamped = value.clamp(TRIGGER_MIN, TRIGGER_MAX);
        if clamped != value {
            warn!(
                requested = value,
                stored = clamped,
                "humidity trigger out of range, clamping"
            );
        }
        self.tx
            .send_modify(|snapshot| snapshot.humidity_trigger = clamped);
    }

    /// Drop all per-connection state in one transition.
    ///
    /// Connection becomes [`ConnectionState::Disconnected`], the reading
    /// and histories empty out, the clothesline returns to
    /// [`ClotheslineState::Unknown`], and the device name clears. The
    /// humidity trigger survives; it is user configuration, not session
    /// state.
    pub fn reset(&self) {
        debug!("resetting session state");
        self.tx.send_modify(|snapshot| {
            let humidity_trigger = snapshot.humidity_trigger;
            *snapshot = StoreSnapshot {
                connection: ConnectionState::Disconnected,
                humidity_trigger,
                ..StoreSnapshot::default()
            };
        });
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Append a sample, dropping the oldest when the history is full.
fn push_bounded(history: &mut Vec<f32>, sample: f32) {
    if history.len() >= HISTORY_LIMIT {
        history.remove(0);
    }
    history.push(sample);
}
