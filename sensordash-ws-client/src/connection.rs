//! Connection manager.
//!
//! [`SensorConnection`] owns at most one live transport. A single supervisor
//! task dials, authenticates, subscribes, feeds decoded frames into the
//! [`SensorHub`] and, when the transport goes away, waits out the reconnect
//! delay and dials again. `disconnect()` aborts that task, which also cancels
//! a pending reconnect timer.
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──open──▶ Connected
//!      ▲                         │  ▲                 │
//!      │                   dial  │  │ delay     close │
//!      │                  failed ▼  │ elapsed   error │
//!      └──disconnect()─────── Reconnecting ◀──────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use once_cell::sync::OnceCell;
use sensordash_core::{SensorHub, SensorUpdate, SensorValue, Snapshot, Subscription, ValueSeries};
use sensordash_ws_protocol::{
    decode_frame, topic_matches, AuthMessage, ClientMessage, DecodedFrame, SubscribeMessage,
};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backoff::Backoff;
use crate::config::SensorClientConfig;
use crate::error::TransportError;
use crate::transport::{Dialer, TransportSession, TungsteniteDialer};

// ════════════════════════════════════════════════════════════════════
// Connection status
// ════════════════════════════════════════════════════════════════════

/// Where the connection manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No supervisor running; nothing happens until `connect()`.
    Disconnected,
    Connecting,
    Connected,
    /// Transport lost; waiting out the reconnect delay.
    Reconnecting,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        })
    }
}

// ════════════════════════════════════════════════════════════════════
// Shared state
// ════════════════════════════════════════════════════════════════════

/// The running supervisor, if any. `generation` is bumped on every
/// `connect()`/`disconnect()` so a superseded task cannot publish. It is
/// also the hub epoch the task's frames are merged under.
struct Supervisor {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    config: SensorClientConfig,
    dialer: Arc<dyn Dialer>,
    hub: SensorHub,
    status: watch::Sender<ConnectionStatus>,
    supervisor: Mutex<Supervisor>,
}

static INSTANCE: OnceCell<SensorConnection> = OnceCell::new();

// ════════════════════════════════════════════════════════════════════
// Public handle
// ════════════════════════════════════════════════════════════════════

/// Realtime sensor feed: one WebSocket, one in-memory state, many observers.
///
/// Cloning yields another handle to the same connection.
///
/// # Example
///
/// ```rust,no_run
/// use sensordash_ws_client::{SensorClientConfig, SensorConnection};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let connection = SensorConnection::new(SensorClientConfig::new("ws://localhost:3001")?);
/// connection.connect()?;
///
/// let _sub = connection.subscribe(|snapshot| {
///     for client in snapshot.iter() {
///         println!("{}: {} sensors", client.client_id, client.sensors.len());
///     }
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SensorConnection {
    inner: Arc<Inner>,
}

impl SensorConnection {
    /// A disconnected manager using the `tokio-tungstenite` transport.
    pub fn new(config: SensorClientConfig) -> Self {
        Self::with_dialer(config, TungsteniteDialer)
    }

    /// A disconnected manager using a custom transport.
    pub fn with_dialer(config: SensorClientConfig, dialer: impl Dialer + 'static) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            inner: Arc::new(Inner {
                hub: SensorHub::with_history_capacity(config.history_capacity()),
                config,
                dialer: Arc::new(dialer),
                status,
                supervisor: Mutex::new(Supervisor {
                    generation: 0,
                    task: None,
                }),
            }),
        }
    }

    /// The process-wide connection, configured from the environment and
    /// connected on first access.
    ///
    /// Never fails. Without a tokio runtime, or with an invalid
    /// `SENSORDASH_WS_URL`, the problem is logged and the instance stays
    /// [`Disconnected`](ConnectionStatus::Disconnected) until `connect()` is
    /// called from inside a runtime.
    pub fn instance() -> &'static SensorConnection {
        INSTANCE.get_or_init(|| {
            let config = SensorClientConfig::from_env().unwrap_or_else(|_e| {
                #[cfg(feature = "tracing")]
                tracing::error!("WS client: {}; falling back to default endpoint", _e);
                SensorClientConfig::default()
                    .with_token_source(crate::token::EnvToken::new(crate::config::TOKEN_ENV))
            });
            let connection = SensorConnection::new(config);
            if let Err(_e) = connection.connect() {
                #[cfg(feature = "tracing")]
                tracing::error!("WS client: cannot start connection: {}", _e);
            }
            connection
        })
    }

    /// Start the supervisor. A no-op while one is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) -> Result<(), TransportError> {
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let mut supervisor = self.inner.lock_supervisor();
        if supervisor
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
        {
            return Ok(());
        }

        supervisor.generation += 1;
        let generation = supervisor.generation;
        self.inner.hub.begin_epoch(generation);
        self.inner.status.send_replace(ConnectionStatus::Connecting);

        #[cfg(feature = "tracing")]
        tracing::info!("WS client: connecting to {}", self.inner.config.url());

        let inner = self.inner.clone();
        supervisor.task = Some(runtime.spawn(async move { inner.supervise(generation).await }));
        Ok(())
    }

    /// Close the transport, cancel any pending reconnect and clear the
    /// sensor state. Observers stay registered and receive the empty
    /// snapshot. Safe to call from inside an observer.
    pub fn disconnect(&self) {
        {
            let mut supervisor = self.inner.lock_supervisor();
            supervisor.generation += 1;
            // Frames of the aborted session still in flight are refused from here on.
            self.inner.hub.begin_epoch(supervisor.generation);
            if let Some(task) = supervisor.task.take() {
                task.abort();
            }
            self.inner.status.send_replace(ConnectionStatus::Disconnected);
        }

        #[cfg(feature = "tracing")]
        tracing::info!("WS client: disconnected from {}", self.inner.config.url());

        self.inner.hub.reset();
    }

    /// Register an observer. It is called right away with the current
    /// snapshot when any data has been received, then on every update.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.inner.hub.subscribe(observer)
    }

    /// The current snapshot.
    pub fn client_sensors(&self) -> Snapshot {
        self.inner.hub.client_sensors()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.borrow()
    }

    /// Receiver that observes every status transition.
    pub fn status_changes(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    /// Recent samples for one sensor.
    pub fn history(&self, client_id: &str, sensor_id: &str) -> Vec<ValueSeries> {
        self.inner.hub.history(client_id, sensor_id)
    }

    pub fn hub(&self) -> &SensorHub {
        &self.inner.hub
    }

    pub fn config(&self) -> &SensorClientConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for SensorConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorConnection")
            .field("url", &self.inner.config.url())
            .field("status", &self.status())
            .field("hub", &self.inner.hub)
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════════
// Supervisor task
// ════════════════════════════════════════════════════════════════════

impl Inner {
    fn lock_supervisor(&self) -> MutexGuard<'_, Supervisor> {
        self.supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock_supervisor().generation == generation
    }

    /// Publish `status` unless this supervisor has been superseded.
    fn set_status(&self, generation: u64, status: ConnectionStatus) {
        let supervisor = self.lock_supervisor();
        if supervisor.generation == generation {
            self.status.send_if_modified(|current| {
                let changed = *current != status;
                *current = status;
                changed
            });
        }
    }

    async fn supervise(self: Arc<Self>, generation: u64) {
        let url = self.config.url().to_string();
        let mut backoff = Backoff::new(self.config.reconnect(), self.config.max_reconnect_attempts());

        loop {
            self.set_status(generation, ConnectionStatus::Connecting);

            match self.dialer.dial(&url).await {
                Ok(mut session) => {
                    backoff.reset();
                    self.set_status(generation, ConnectionStatus::Connected);

                    #[cfg(feature = "tracing")]
                    tracing::info!("WS client: connected to {}", url);

                    let result = self.run_session(generation, session.as_mut()).await;
                    session.close().await;

                    match result {
                        Ok(()) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!("WS client: connection to {} closed", url);
                        }
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!("WS client: connection to {} failed: {}", url, _e);
                        }
                    }
                }
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("WS client: {}", _e);
                }
            }

            if !self.is_current(generation) {
                return;
            }

            let Some(delay) = backoff.next_delay() else {
                #[cfg(feature = "tracing")]
                tracing::error!(
                    "WS client: max reconnect attempts ({}) reached, giving up",
                    self.config.max_reconnect_attempts()
                );
                self.set_status(generation, ConnectionStatus::Disconnected);
                return;
            };

            self.set_status(generation, ConnectionStatus::Reconnecting);

            #[cfg(feature = "tracing")]
            tracing::info!(
                "WS client: reconnecting in {}ms (attempt {})",
                delay.as_millis(),
                backoff.attempt()
            );

            tokio::time::sleep(delay).await;
        }
    }

    /// Authenticate, subscribe, then pump inbound frames until the transport
    /// closes.
    async fn run_session(
        &self,
        generation: u64,
        session: &mut dyn TransportSession,
    ) -> Result<(), TransportError> {
        let auth = ClientMessage::from(AuthMessage::new(self.config.token()));
        session.send_text(serde_json::to_string(&auth)?).await?;

        let subscribe =
            ClientMessage::from(SubscribeMessage::subscribe(self.config.subscribe_pattern()));
        session.send_text(serde_json::to_string(&subscribe)?).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "WS client: subscribed to '{}'",
            self.config.subscribe_pattern()
        );

        while let Some(text) = session.next_text().await? {
            if !self.is_current(generation) {
                return Ok(());
            }
            self.handle_frame(generation, &text);
        }
        Ok(())
    }

    /// Decode one frame and merge it. Bad frames are logged and dropped.
    fn handle_frame(&self, generation: u64, text: &str) {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("WS client: dropping frame: {}", _e);
                return;
            }
        };

        if !topic_matches(self.config.subscribe_pattern(), &frame.topic.as_topic()) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "WS client: ignoring '{}' outside subscription",
                frame.topic.as_topic()
            );
            return;
        }

        if self
            .hub
            .apply_in_epoch(generation, into_update(frame))
            .is_none()
        {
            #[cfg(feature = "tracing")]
            tracing::debug!("WS client: dropping frame from superseded session");
        }
    }
}

fn into_update(frame: DecodedFrame) -> SensorUpdate {
    let values = frame
        .values
        .into_iter()
        .map(|v| SensorValue::new(v.value_type, v.value))
        .collect();
    SensorUpdate::new(frame.topic.client_id, frame.topic.sensor_id, values)
}

impl SensorConnection {
    /// Wait until the status equals `target` or `timeout` elapses.
    pub async fn wait_for(&self, target: ConnectionStatus, timeout: Duration) -> bool {
        let mut changes = self.status_changes();
        let reached = matches!(
            tokio::time::timeout(timeout, changes.wait_for(|status| *status == target)).await,
            Ok(Ok(_))
        );
        reached
    }
}
