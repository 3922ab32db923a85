//! Error types for the connection manager.

use thiserror::Error;

/// Failures of the underlying WebSocket transport.
///
/// None of these reach observers: the supervisor logs them and schedules a
/// reconnect. They surface through [`Dialer`](crate::Dialer) and
/// [`TransportSession`](crate::TransportSession) implementations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("failed to send frame: {0}")]
    Send(String),

    #[error("failed to receive frame: {0}")]
    Receive(String),

    #[error("connection closed")]
    Closed,

    #[error("failed to encode outbound frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no tokio runtime available to drive the connection")]
    NoRuntime,
}

impl TransportError {
    pub fn connect(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Connect {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Invalid connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported URL '{0}': expected a ws:// or wss:// endpoint")]
    InvalidUrl(String),
}
