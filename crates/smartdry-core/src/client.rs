//! BLE link client driving the session state store.
//!
//! [`LinkClient`] owns the connection lifecycle on behalf of an interface:
//! it discovers a clothesline, opens the channel, subscribes to telemetry,
//! folds every notification into the shared [`StateStore`], and sends
//! motor commands. The interface never touches BLE handles; it reads the
//! store and calls the client.
//!
//! # Lifecycle
//!
//! The store's connection state moves `idle → connecting → connected`,
//! and from there to `disconnected` (user request or link loss) or
//! `error` (any failure, with a user-facing message). A failed or closed
//! link can always re-enter `connecting` with a new connect call.
//!
//! Every failure inside connect, disconnect, and send is caught here,
//! classified, and published to the store; nothing propagates to the
//! interface as an unhandled fault.
//!
//! # Example
//!
//! ```no_run
//! use smartdry_core::LinkClient;
//! use smartdry_store::StateStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = StateStore::shared();
//!     let client = LinkClient::new(store.clone());
//!
//!     client.connect().await?;
//!     client.retract().await?;
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::Central;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use smartdry_store::{CommandStatus, ConnectionState, SharedStore, StateStore};
use smartdry_types::{Command, SensorPacket};

use crate::device::{ConnectionConfig, Device};
use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::policy::{decide_clothesline, optimistic_state};
use crate::scan::{ScanOptions, find_device_with_adapter, get_adapter, scan_with_adapter};
use crate::traits::ClotheslineDevice;

/// One established link: the device plus the monitor watching it.
///
/// Exists only while connected; dropped as a unit so the session handles
/// can never outlive the connection they belong to.
struct LinkSession {
    device: Arc<dyn ClotheslineDevice>,
    monitor_token: CancellationToken,
    monitor_handle: JoinHandle<()>,
}

/// BLE link client bound to a shared state store.
///
/// All methods take `&self`; wrap the client in an `Arc` to drive it from
/// multiple tasks. Session handles (device, subscription, command channel)
/// are owned exclusively by the client and torn down as a unit.
pub struct LinkClient {
    /// Store receiving every lifecycle and telemetry transition.
    store: SharedStore,
    /// Timeouts applied to each transport step.
    config: ConnectionConfig,
    /// The active session, if connected.
    ///
    /// Shared with the link monitor task so either side can tear the
    /// session down when the link dies.
    session: Arc<Mutex<Option<LinkSession>>>,
    /// Cancellation token for the connect attempt in flight, if any.
    ///
    /// Doubles as the reentrancy guard: a second connect while this slot
    /// is occupied is rejected instead of queued.
    connect_cancel: Mutex<Option<CancellationToken>>,
}

impl std::fmt::Debug for LinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LinkClient {
    /// Create a client with default connection configuration.
    pub fn new(store: SharedStore) -> Self {
        Self::with_config(store, ConnectionConfig::default())
    }

    /// Create a client with custom timeouts.
    pub fn with_config(store: SharedStore, config: ConnectionConfig) -> Self {
        Self {
            store,
            config,
            session: Arc::new(Mutex::new(None)),
            connect_cancel: Mutex::new(None),
        }
    }

    /// The store this client publishes to.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The connection configuration in use.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether a session is currently held.
    ///
    /// This checks for a session handle; the link monitor notices an
    /// actually-dead link within one poll interval and clears it.
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Address of the connected device, if any.
    pub async fn device_address(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|link| link.device.address().to_owned())
    }

    /// Connect to the first clothesline found in range.
    ///
    /// Scans with the SmartDry name and service filter and connects to the
    /// first match. Publishes `connecting` and then `connected` to the
    /// store; any failure publishes `error` with a user-facing message and
    /// is also returned to the caller.
    ///
    /// A second connect while one is in flight fails with
    /// [`Error::LinkBusy`]; connecting while already connected is a no-op.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn connect(&self) -> Result<()> {
        self.connect_inner(None).await
    }

    /// Connect to a specific clothesline by name, address, or peripheral ID.
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn connect_to(&self, identifier: &str) -> Result<()> {
        self.connect_inner(Some(identifier)).await
    }

    /// Connect to an already-discovered device.
    ///
    /// Runs the same pipeline as [`connect`](Self::connect) from the
    /// post-discovery point: open the channel, verify the command
    /// channel, subscribe to telemetry, start the link monitor, and
    /// publish `connected`. This is the seam where a mock device plugs
    /// in; it carries the same reentrancy and failure behavior.
    #[tracing::instrument(level = "info", skip_all, fields(device = ?device.name()))]
    pub async fn connect_device(&self, device: Arc<dyn ClotheslineDevice>) -> Result<()> {
        self.run_attempt(async {
            self.store.set_connection_state(ConnectionState::Connecting);
            self.wire_session(device).await
        })
        .await
    }

    async fn connect_inner(&self, target: Option<&str>) -> Result<()> {
        self.run_attempt(self.establish(target)).await
    }

    /// Drive one connect attempt under the reentrancy and cancellation
    /// rules, then install the session it produces.
    async fn run_attempt<F>(&self, attempt: F) -> Result<()>
    where
        F: Future<Output = Result<Arc<dyn ClotheslineDevice>>>,
    {
        if self.session.lock().await.is_some() {
            debug!("Already connected, ignoring connect request");
            return Ok(());
        }

        // Register this attempt; a concurrent connect is rejected rather
        // than queued behind us
        let cancel = CancellationToken::new();
        {
            let mut slot = self.connect_cancel.lock().await;
            if slot.is_some() {
                return Err(Error::LinkBusy);
            }
            *slot = Some(cancel.clone());
        }

        let result = tokio::select! {
            result = attempt => result,
            _ = cancel.cancelled() => Err(Error::Cancelled),
        };

        // A canceller takes the token out of the slot itself; clear it
        // only while it is still ours, or a newer attempt's token could
        // be wiped
        if !cancel.is_cancelled() {
            *self.connect_cancel.lock().await = None;
        }

        let device = match result {
            Ok(device) => device,
            Err(e) => {
                // A cancelled attempt's final state belongs to whoever
                // cancelled it: disconnect() resets the store itself,
                // cancel_connect() publishes the cancellation
                if !matches!(e, Error::Cancelled) {
                    self.store
                        .set_connection_state(ConnectionState::error(e.to_string()));
                }
                return Err(e);
            }
        };

        {
            let mut session = self.session.lock().await;
            if cancel.is_cancelled() {
                // Cancelled between establishment and install; tear the
                // fresh connection straight back down
                drop(session);
                debug!("Connect attempt cancelled after establish, discarding");
                if let Err(e) = device.disconnect().await {
                    debug!(error = %e, "Discarding cancelled connection failed");
                }
                return Err(Error::Cancelled);
            }
            if session.is_some() {
                // Another path installed a session while we were
                // connecting; discard ours
                drop(session);
                debug!("Session already installed, discarding duplicate connection");
                if let Err(e) = device.disconnect().await {
                    debug!(error = %e, "Discarding duplicate connection failed");
                }
                return Ok(());
            }

            let monitor_token = CancellationToken::new();
            let monitor_handle = spawn_link_monitor(
                Arc::clone(&device),
                Arc::clone(&self.store),
                Arc::clone(&self.session),
                monitor_token.clone(),
                self.config.link_check_interval,
            );
            *session = Some(LinkSession {
                device,
                monitor_token,
                monitor_handle,
            });
        }

        // Session is installed before the state flips, so observers never
        // see `connected` without handles behind it
        self.store.set_connection_state(ConnectionState::Connected);
        info!("Clothesline connected");
        Ok(())
    }

    /// Run the discovery half of a connect attempt, then hand the
    /// device to the shared pipeline.
    async fn establish(&self, target: Option<&str>) -> Result<Arc<dyn ClotheslineDevice>> {
        // Availability guard: if Bluetooth itself is unusable, fail
        // before any state transition or discovery
        let adapter = get_adapter().await?;

        self.store.set_connection_state(ConnectionState::Connecting);

        let peripheral = match target {
            Some(identifier) => {
                // The identifier may be an address that never advertises
                // the SmartDry name, so match against all devices
                let options = ScanOptions::default().all_devices();
                find_device_with_adapter(&adapter, identifier, options).await?
            }
            None => {
                let discovered = scan_with_adapter(&adapter, ScanOptions::default()).await?;
                let first = discovered
                    .first()
                    .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange))?;
                info!(name = ?first.name, "Connecting to first discovered clothesline");
                adapter.peripheral(&first.id).await?
            }
        };

        let device: Arc<dyn ClotheslineDevice> = Arc::new(
            Device::from_peripheral_with_config(adapter, peripheral, self.config.clone()).await?,
        );
        self.wire_session(device).await
    }

    /// Run the post-discovery pipeline over any transport.
    ///
    /// Opens the channel, records the device name, verifies the command
    /// channel, and subscribes the telemetry handler. On any failure
    /// after the channel opens, the device is disconnected best-effort
    /// so nothing is left half-subscribed.
    async fn wire_session(
        &self,
        device: Arc<dyn ClotheslineDevice>,
    ) -> Result<Arc<dyn ClotheslineDevice>> {
        device.open_channel().await?;
        self.store
            .set_device_name(device.name().map(str::to_owned));

        if let Err(e) = self.wire_telemetry(device.as_ref()).await {
            if let Err(cleanup) = device.disconnect().await {
                debug!(error = %cleanup, "Cleanup disconnect after wiring failure failed");
            }
            return Err(e);
        }

        Ok(device)
    }

    /// Verify the command channel and subscribe to telemetry.
    async fn wire_telemetry(&self, device: &dyn ClotheslineDevice) -> Result<()> {
        // The command channel must resolve now, not at first send; a
        // clothesline without it is not usable
        if !device.has_command_channel().await {
            return Err(Error::CommandChannelUnavailable);
        }

        let store = Arc::clone(&self.store);
        device
            .subscribe_sensor(Box::new(move |data| {
                apply_telemetry(&store, data);
            }))
            .await
    }

    /// Abort the connect attempt in flight, if any.
    ///
    /// The attempt fails with [`Error::Cancelled`] and the store shows
    /// the cancellation message. Does nothing when no attempt is running.
    pub async fn cancel_connect(&self) {
        if let Some(token) = self.connect_cancel.lock().await.take() {
            info!("Cancelling connection attempt");
            token.cancel();
            self.store
                .set_connection_state(ConnectionState::error(Error::Cancelled.to_string()));
        }
    }

    /// Disconnect and clear all session state.
    ///
    /// Unsubscribe and channel close are best-effort; whatever they do,
    /// the session handles are dropped and the store is reset to
    /// `disconnected`. Safe to call when no connection is active.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn disconnect(&self) -> Result<()> {
        // A connect still in flight is aborted first; its attempt sees
        // `Cancelled` and leaves the final state to us
        if let Some(token) = self.connect_cancel.lock().await.take() {
            debug!("Cancelling in-flight connect before disconnect");
            token.cancel();
        }

        let link = self.session.lock().await.take();

        if let Some(link) = link {
            link.monitor_token.cancel();
            link.monitor_handle.abort();

            if let Err(e) = link.device.unsubscribe_sensor().await {
                debug!(error = %e, "Unsubscribe during disconnect failed");
            }
            if let Err(e) = link.device.disconnect().await {
                debug!(error = %e, "Channel close during disconnect failed");
            }
        }

        // Cleanup always completes, whether or not a session existed and
        // whatever the teardown calls returned
        self.store.reset();
        info!("Disconnected");
        Ok(())
    }

    /// Send a motor command to the connected clothesline.
    ///
    /// Marks the store `sending` for the duration of the write. On
    /// success the clothesline state is set optimistically (extend opens,
    /// retract closes); on failure the store shows an error and the
    /// clothesline state is left untouched, since the motor may or may
    /// not have received the command. The command status always returns
    /// to `idle`.
    #[tracing::instrument(level = "debug", skip(self), fields(command = %command))]
    pub async fn send_command(&self, command: Command) -> Result<()> {
        let device = {
            let session = self.session.lock().await;
            match session.as_ref() {
                Some(link) => Arc::clone(&link.device),
                None => {
                    // Guard runs before any status change: a send with no
                    // command channel must not flip the status to sending
                    let err = Error::CommandChannelUnavailable;
                    self.store
                        .set_connection_state(ConnectionState::error(err.to_string()));
                    return Err(err);
                }
            }
        };

        send_via(&self.store, device.as_ref(), command).await
    }

    /// Extend the clothesline.
    pub async fn extend(&self) -> Result<()> {
        self.send_command(Command::Extend).await
    }

    /// Retract the clothesline.
    pub async fn retract(&self) -> Result<()> {
        self.send_command(Command::Retract).await
    }
}

/// Write a command to a device, bracketed by the store's command status.
///
/// The status is `sending` for the duration of the write and returns to
/// `idle` whatever the outcome. Success updates the clothesline state
/// optimistically; failure publishes an error and leaves the clothesline
/// state alone, since the motor may or may not have received the command.
async fn send_via<D: ClotheslineDevice + ?Sized>(
    store: &StateStore,
    device: &D,
    command: Command,
) -> Result<()> {
    store.set_command_status(CommandStatus::Sending);

    let outcome = match device.send_command(command).await {
        Ok(()) => {
            if let Some(state) = optimistic_state(command) {
                store.set_clothesline_state(state);
            }
            info!(command = %command, "Motor command sent");
            Ok(())
        }
        Err(e) => {
            store
                .set_connection_state(ConnectionState::error(e.to_string()));
            Err(e)
        }
    };

    // The error transition, if any, is already published, so observers
    // see the failure before the status returns to idle
    store.set_command_status(CommandStatus::Idle);

    outcome
}

/// Decode one telemetry notification and fold it into the store.
///
/// Called from the notification task for every packet; also the seam for
/// driving the full telemetry pipeline in tests without a radio. Never
/// fails: a malformed packet degrades to absent fields, and a packet
/// that admits no decision leaves the clothesline state unchanged.
pub fn apply_telemetry(store: &StateStore, data: &[u8]) {
    trace!(len = data.len(), "Telemetry notification received");
    let packet = SensorPacket::from_bytes(data);

    store.set_sensor_data(packet);
    if let Some(state) = decide_clothesline(&packet, store.humidity_trigger()) {
        store.set_clothesline_state(state);
    }
}

/// Watch the link and tear the session down when it dies.
///
/// The BLE stack reports disconnects with some lag, so the monitor polls
/// rather than waiting on an event. On link loss it clears the session,
/// resets the store to `disconnected`, and exits.
fn spawn_link_monitor(
    device: Arc<dyn ClotheslineDevice>,
    store: SharedStore,
    session: Arc<Mutex<Option<LinkSession>>>,
    cancel_token: CancellationToken,
    poll_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut check_interval = interval(poll_interval);
        // The first tick completes immediately; skip it so a fresh link
        // is not polled before the stack has settled
        check_interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("Link monitor cancelled, shutting down");
                    break;
                }
                _ = check_interval.tick() => {
                    if device.is_connected().await {
                        continue;
                    }

                    warn!("Clothesline link lost");
                    let taken = session.lock().await.take();
                    if let Some(link) = taken {
                        // The peripheral is already gone; this only
                        // releases local handles, so failures just get
                        // logged
                        if let Err(e) = link.device.disconnect().await {
                            debug!(error = %e, "Cleanup disconnect after link loss failed");
                        }
                    }
                    store.reset();
                    break;
                }
            }
        }
    })
}
