//! CLI Error Types
//!
//! Errors carry a hint line so a failed command tells the user what to try.

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI-specific errors with helpful messages and hints
#[derive(Debug, Error)]
pub enum CliError {
    /// Endpoint URL rejected before dialing
    #[error("Invalid endpoint: {0}\n  Hint: Use a ws:// or wss:// URL, e.g. ws://localhost:3001")]
    InvalidEndpoint(#[from] sensordash_ws_client::ConfigError),

    /// The connection could not be started
    #[error("Connection failed: {url}\n  Reason: {reason}\n  Hint: Is the sensor gateway running? Try 'sensordash simulate' for a local feed")]
    ConnectionFailed { url: String, reason: String },

    /// No data arrived within the wait window
    #[error("No sensor data received from {url} within {waited_ms} ms\n  Hint: Increase --wait-ms or check the subscription pattern")]
    NoData { url: String, waited_ms: u64 },

    /// Simulator could not bind its listen address
    #[error("Cannot listen on {addr}\n  Reason: {reason}\n  Hint: Pick another address with --bind")]
    BindFailed { addr: String, reason: String },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a connection failed error
    pub fn connection_failed(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ConnectionFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a bind failed error
    pub fn bind_failed(addr: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::BindFailed {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }
}
