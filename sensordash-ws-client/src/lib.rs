//! # sensordash-ws-client
//!
//! Realtime connection manager for the sensordash dashboard.
//!
//! A [`SensorConnection`] keeps exactly one WebSocket open to the sensor
//! gateway. On every open it sends the auth frame and subscribes; it decodes
//! every inbound frame into the [`SensorHub`](sensordash_core::SensorHub) and
//! fans the new snapshot out to observers. When the transport drops it waits
//! out the reconnect delay and dials again, indefinitely by default.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sensordash_ws_client::SensorConnection;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // Reads SENSORDASH_WS_URL / SENSORDASH_TOKEN and connects.
//! let connection = SensorConnection::instance();
//!
//! let _sub = connection.subscribe(|snapshot| {
//!     println!("{} clients reporting", snapshot.len());
//! });
//! # }
//! ```
//!
//! ## Wire Protocol
//!
//! Frames are defined in [`sensordash_ws_protocol`].
//!
//! ## Testing
//!
//! The network is behind the [`Dialer`] / [`TransportSession`] traits; build
//! isolated instances with [`SensorConnection::with_dialer`].

// ════════════════════════════════════════════════════════════════════
// Modules
// ════════════════════════════════════════════════════════════════════

pub mod backoff;
pub mod config;
pub mod connection;
pub mod error;
pub mod token;
pub mod transport;

// ════════════════════════════════════════════════════════════════════
// Public re-exports
// ════════════════════════════════════════════════════════════════════

pub use backoff::{Backoff, ReconnectPolicy, DEFAULT_RECONNECT_DELAY};
pub use config::{SensorClientConfig, DEFAULT_WS_URL, TOKEN_ENV, WS_URL_ENV};
pub use connection::{ConnectionStatus, SensorConnection};
pub use error::{ConfigError, TransportError};
pub use token::{EnvToken, FileToken, TokenSource};
pub use transport::{Dialer, TransportSession, TungsteniteDialer};

pub use sensordash_core::{Snapshot, Subscription};
