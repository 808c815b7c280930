//! Link session
//!
//! Owns one connection at a time and drives it through
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected
//!                     |             |
//!                     +-> Error <---+
//! ```
//!
//! `Error` stays until the caller connects again; there is no automatic
//! reconnect. While connected a single receive task decodes and dispatches
//! frames in wire order and is the only writer of the vehicle state. [`LinkSession::disconnect`] joins that task before
//! resetting the state, so no stale write can land after it returns.
//!
//! Outbound frames share one encoder behind an async mutex, which keeps the
//! sequence numbers in the same order as the bytes on the wire. Closing the
//! link cancels any write still in flight, so a transport that stops
//! accepting bytes cannot hold up [`LinkSession::disconnect`].

mod receiver;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::codec::{DecoderStats, FrameEncoder};
use crate::command::{Command, CommandError, Target};
use crate::config::{ConnectionConfig, LinkConfig};
use crate::messages::MavMessage;
use crate::params::ParameterTable;
use crate::transport::{Connected, Connector, TransportError, TransportTx};
use crate::vehicle::{VehicleState, VehicleStore};

/// Link lifecycle as seen by observers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The connection failed; carries a short diagnostic
    Error(String),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// Session counters
///
/// Link counters accumulate across connections until
/// [`LinkSession::reset_stats`]; `decoder` covers the current connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames applied to the vehicle state or parameter table
    pub frames_dispatched: u64,
    /// Verified frames whose message the link does not act on
    pub unhandled: u64,
    /// Frames that could not be checksum-verified (ID outside the dialect),
    /// not dispatched. Line noise resembling a header counts here.
    pub unverified: u64,
    /// Frames rejected while dispatching
    pub dispatch_errors: u64,
    /// Frames written by this side
    pub frames_sent: u64,
    pub decoder: DecoderStats,
}

/// Longest wait for the receive task to stop, and for the writer to close
const TEARDOWN_GRACE: Duration = Duration::from_secs(1);

/// Sending half plus the encoder that owns the sequence counter
struct LinkWriter {
    tx: Box<dyn TransportTx>,
    encoder: FrameEncoder,
}

/// State shared between the session and its receive task
struct Shared {
    store: VehicleStore,
    params: Mutex<ParameterTable>,
    state: watch::Sender<ConnectionState>,
    writer: tokio::sync::Mutex<Option<LinkWriter>>,
    /// `true` while no writer accepts frames; flipping it aborts pending sends
    closed: watch::Sender<bool>,
    stats: Mutex<SessionStats>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        info!("link {state}");
        self.state.send_replace(state);
    }

    /// Encode and write one message.
    ///
    /// Gives up with [`CommandError::NotConnected`] as soon as the link
    /// closes, even when the transport is blocked mid-write.
    async fn send(&self, msg: &MavMessage) -> Result<(), CommandError> {
        let mut closed = self.closed.subscribe();
        tokio::select! {
            biased;

            _ = closed.wait_for(|closed| *closed) => Err(CommandError::NotConnected),
            result = self.write(msg) => result,
        }
    }

    async fn write(&self, msg: &MavMessage) -> Result<(), CommandError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(CommandError::NotConnected)?;
        let frame = writer.encoder.encode(msg)?;
        writer.tx.send(&frame.to_bytes()).await?;
        self.stats.lock().frames_sent += 1;
        Ok(())
    }

    /// Close the writer after a transport failure and enter `Error`.
    async fn fail(&self, reason: String) {
        self.close_writer().await;
        self.set_state(ConnectionState::Error(reason));
    }

    /// Stop accepting frames and drop the sending half.
    async fn close_writer(&self) {
        self.closed.send_replace(true);

        let taken = match timeout(TEARDOWN_GRACE, self.writer.lock()).await {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                warn!("writer still busy after {TEARDOWN_GRACE:?}, left to the pending send");
                return;
            }
        };
        if let Some(mut writer) = taken {
            if timeout(TEARDOWN_GRACE, writer.tx.close()).await.is_err() {
                warn!("transport close timed out, dropping it");
            }
        }
    }
}

/// Receive task of the open connection
struct ActiveLink {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// One ground station link to one vehicle
pub struct LinkSession {
    connector: Arc<dyn Connector>,
    config: LinkConfig,
    shared: Arc<Shared>,
    active: tokio::sync::Mutex<Option<ActiveLink>>,
}

impl LinkSession {
    /// Create a disconnected session
    ///
    /// # Arguments
    ///
    /// * `connector` - Opens transports, [`SocketConnector`](crate::transport::SocketConnector) for real sockets
    /// * `config` - Identity, timing and buffer settings
    pub fn new(connector: Arc<dyn Connector>, config: LinkConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (closed, _) = watch::channel(true);
        let shared = Shared {
            store: VehicleStore::new(config.subscriber_capacity),
            params: Mutex::new(ParameterTable::new()),
            state,
            writer: tokio::sync::Mutex::new(None),
            closed,
            stats: Mutex::new(SessionStats::default()),
        };
        Self {
            connector,
            config,
            shared: Arc::new(shared),
            active: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.state.borrow().clone()
    }

    /// Watch connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Latest vehicle snapshot
    pub fn snapshot(&self) -> Arc<VehicleState> {
        self.shared.store.snapshot()
    }

    /// Receive every vehicle snapshot published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<VehicleState>> {
        self.shared.store.subscribe()
    }

    /// Copy of the parameter table
    pub fn parameters(&self) -> ParameterTable {
        self.shared.params.lock().clone()
    }

    pub fn stats(&self) -> SessionStats {
        *self.shared.stats.lock()
    }

    pub fn reset_stats(&self) {
        *self.shared.stats.lock() = SessionStats::default();
    }

    /// Open a connection and start receiving.
    ///
    /// Any existing connection is torn down first, and the vehicle state and
    /// parameter table start from defaults.
    ///
    /// # Errors
    ///
    /// The transport error, after the state has moved to
    /// [`ConnectionState::Error`].
    pub async fn connect(&self, target: &ConnectionConfig) -> Result<(), TransportError> {
        let mut active = self.active.lock().await;
        self.teardown(&mut active).await;
        self.clear_vehicle();

        self.shared.set_state(ConnectionState::Connecting);
        info!("connecting to {target}");

        let Connected {
            rx,
            tx,
            description,
        } = match self.connector.connect(target).await {
            Ok(connected) => connected,
            Err(err) => {
                warn!("connect to {target} failed: {err}");
                self.shared.set_state(ConnectionState::Error(err.to_string()));
                return Err(err);
            }
        };

        let encoder = FrameEncoder::new(
            self.config.system_id,
            self.config.component_id,
            self.config.version,
        );
        *self.shared.writer.lock().await = Some(LinkWriter { tx, encoder });
        self.shared.closed.send_replace(false);
        self.shared.stats.lock().decoder = DecoderStats::default();

        // Connected must be published before the task can report a failure
        info!("transport open: {description}");
        self.shared.set_state(ConnectionState::Connected);

        let (cancel, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(receiver::run(
            self.shared.clone(),
            self.config.clone(),
            rx,
            cancel_rx,
        ));
        *active = Some(ActiveLink { cancel, task });
        Ok(())
    }

    /// Close the connection and reset the vehicle state.
    ///
    /// Safe to call in any state; does nothing when already disconnected.
    pub async fn disconnect(&self) {
        let mut active = self.active.lock().await;
        if active.is_none() && self.state() == ConnectionState::Disconnected {
            return;
        }
        self.teardown(&mut active).await;
        self.clear_vehicle();
        self.shared.set_state(ConnectionState::Disconnected);
    }

    /// Send a command to the vehicle, without waiting for an acknowledgement.
    ///
    /// The command is addressed to the origin of the last vehicle heartbeat.
    /// A [`Command::SetParameter`] also stages the new value in the
    /// parameter table until the vehicle echoes it.
    pub async fn send_command(&self, command: Command) -> Result<(), CommandError> {
        let target = Target::from_state(&self.shared.store.snapshot());
        let msg = command.to_message(target)?;

        if let Command::SetParameter { id, value } = &command {
            self.shared.params.lock().stage(id, *value)?;
            let sent = self.shared.send(&msg).await;
            if sent.is_err() {
                self.shared.params.lock().unstage(id);
            }
            return sent;
        }
        self.shared.send(&msg).await
    }

    /// Send one ground station heartbeat now
    pub async fn send_heartbeat(&self) -> Result<(), CommandError> {
        self.send_command(Command::Heartbeat).await
    }

    /// Stop the receive task and close the transport.
    ///
    /// The task gets [`TEARDOWN_GRACE`] to notice the cancel signal and is
    /// aborted after that.
    async fn teardown(&self, active: &mut Option<ActiveLink>) {
        self.shared.closed.send_replace(true);

        if let Some(mut link) = active.take() {
            // Err means the task already ended on its own
            let _ = link.cancel.send(true);
            match timeout(TEARDOWN_GRACE, &mut link.task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("receive task ended abnormally: {err}"),
                Err(_) => {
                    warn!("receive task still running after {TEARDOWN_GRACE:?}, aborting");
                    link.task.abort();
                    let _ = link.task.await;
                }
            }
        }
        self.shared.close_writer().await;
    }

    fn clear_vehicle(&self) {
        self.shared.store.reset();
        self.shared.params.lock().clear();
    }
}
