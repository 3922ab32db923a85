//! Development gateway that streams simulated sensor readings.
//!
//! ```text
//! Feed ──tick──▶ broadcast ──▶ session (filter by subscription) ──WebSocket──▶ dashboard
//! ```

pub mod feed;
mod server;
mod session;

use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::{CliError, CliResult};
use feed::Feed;
use server::ServerState;

/// Frames buffered per session before a slow consumer starts skipping.
const FRAME_BUFFER: usize = 1024;

/// Settings for [`start`].
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub bind: SocketAddr,
    /// First topic segment, e.g. `user` in `user/client1/temperature`.
    pub prefix: String,
    pub clients: usize,
    pub interval: Duration,
    /// Token dashboards must send; `None` accepts anyone.
    pub token: Option<String>,
}

/// Handle to a running simulator. Dropping it does not stop the tasks; call
/// [`shutdown`](Self::shutdown).
pub struct RunningSimulator {
    pub local_addr: SocketAddr,
    server: JoinHandle<CliResult<()>>,
    feed: JoinHandle<()>,
}

impl RunningSimulator {
    pub fn url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    pub fn shutdown(self) {
        self.feed.abort();
        self.server.abort();
    }

    /// Resolve when the server task stops on its own (i.e. fails).
    pub async fn wait(&mut self) -> CliResult<()> {
        match (&mut self.server).await {
            Ok(result) => result,
            Err(e) => Err(anyhow::Error::new(e).context("simulator server task").into()),
        }
    }
}

/// Bind the listener, then start the server and the feed in the background.
pub async fn start(config: SimulatorConfig) -> CliResult<RunningSimulator> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| CliError::bind_failed(config.bind.to_string(), e))?;
    let local_addr = listener.local_addr()?;

    let (frames, _) = broadcast::channel(FRAME_BUFFER);
    let state = ServerState {
        frames: frames.clone(),
        token: config.token.as_deref().map(Arc::from),
        sessions: Arc::new(AtomicUsize::new(0)),
        simulated_clients: config.clients,
        started_at: Instant::now(),
    };

    let app = server::router(state);
    let server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .context("simulator server stopped")?;
        Ok::<(), CliError>(())
    });

    tracing::info!("Simulator listening on {}", local_addr);

    let mut rng = StdRng::from_entropy();
    let mut feed = Feed::new(config.prefix, config.clients, &mut rng);
    let interval = config.interval;
    let feed = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match feed.tick(&mut rng) {
                Ok(batch) => {
                    for frame in batch {
                        // No receivers just means no dashboard is connected.
                        let _ = frames.send(Arc::new(frame));
                    }
                }
                Err(e) => tracing::error!("Failed to encode simulated frame: {}", e),
            }
        }
    });

    Ok(RunningSimulator {
        local_addr,
        server,
        feed,
    })
}
