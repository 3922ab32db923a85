//! CLI Command Implementations
//!
//! This module contains the implementations for all CLI commands.

pub mod simulate;
pub mod snapshot;
pub mod watch;

use clap::Args;
use sensordash_ws_client::{SensorClientConfig, SensorConnection, DEFAULT_WS_URL};

use crate::error::{CliError, CliResult};

/// Endpoint options shared by commands that connect to a gateway
#[derive(Debug, Clone, Args)]
pub struct ConnectArgs {
    /// WebSocket endpoint of the sensor gateway
    #[arg(short, long, env = "SENSORDASH_WS_URL", default_value = DEFAULT_WS_URL)]
    pub url: String,

    /// Bearer token sent on connect
    #[arg(short, long, env = "SENSORDASH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Topic pattern to subscribe to (`#` = everything)
    #[arg(long, default_value = "#")]
    pub subscribe: String,
}

impl ConnectArgs {
    /// Build the connection config these options describe.
    pub fn config(&self) -> CliResult<SensorClientConfig> {
        Ok(SensorClientConfig::new(self.url.clone())?
            .with_token(self.token.clone())
            .with_subscribe_pattern(self.subscribe.clone()))
    }

    /// Create a connection and start it.
    pub fn connect(&self) -> CliResult<SensorConnection> {
        let connection = SensorConnection::new(self.config()?);
        connection
            .connect()
            .map_err(|e| CliError::connection_failed(&self.url, e))?;
        Ok(connection)
    }
}
