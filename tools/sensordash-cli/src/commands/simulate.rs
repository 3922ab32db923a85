//! Simulate Command - local sensor gateway for development

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;
use colored::Colorize;
use tokio::signal;

use crate::error::CliResult;
use crate::simulator::{self, SimulatorConfig};

/// Serve a simulated sensor feed over WebSocket
#[derive(Debug, Args)]
pub struct SimulateCommand {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:3001")]
    pub bind: SocketAddr,

    /// First topic segment of every frame
    #[arg(short, long, default_value = "user")]
    pub prefix: String,

    /// Number of simulated clients
    #[arg(short, long, default_value = "6")]
    pub clients: usize,

    /// Milliseconds between readings
    #[arg(short, long, default_value = "500")]
    pub interval_ms: u64,

    /// Require dashboards to present this token
    #[arg(short, long, env = "SENSORDASH_SIM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl SimulateCommand {
    pub async fn execute(self) -> CliResult<()> {
        let mut sim = simulator::start(SimulatorConfig {
            bind: self.bind,
            prefix: self.prefix,
            clients: self.clients,
            interval: Duration::from_millis(self.interval_ms.max(1)),
            token: self.token,
        })
        .await?;

        println!(
            "🛰️  Simulating {} clients at {} (every {} ms)",
            self.clients.to_string().bold(),
            sim.url().bold(),
            self.interval_ms
        );
        println!("{}", "Press Ctrl+C to stop".dimmed());

        let result = tokio::select! {
            result = sim.wait() => result,
            _ = signal::ctrl_c() => Ok(()),
        };

        sim.shutdown();
        println!("{}", "✅ Simulator stopped".green());
        result
    }
}
