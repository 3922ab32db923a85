//! sensordash CLI - live sensor dashboard in the terminal
//!
//! Connects to a sensor gateway over WebSocket and prints the current state of
//! every reporting client, or runs a simulated gateway for development.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod simulator;

use commands::{simulate::SimulateCommand, snapshot::SnapshotCommand, watch::WatchCommand};

/// sensordash CLI - Watch live sensor readings
#[derive(Debug, Parser)]
#[command(name = "sensordash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch sensor values in real-time
    #[command(name = "watch")]
    Watch(WatchCommand),

    /// Print the current sensor values once
    #[command(name = "snapshot")]
    Snapshot(SnapshotCommand),

    /// Run a simulated sensor gateway
    #[command(name = "simulate")]
    Simulate(SimulateCommand),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Watch(cmd) => cmd.execute().await,
        Command::Snapshot(cmd) => cmd.execute().await,
        Command::Simulate(cmd) => cmd.execute().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; stdout carries tables and JSON. `RUST_LOG` overrides `-v`.
fn init_logging(verbose: bool) {
    let default_level = if verbose {
        "sensordash=debug,sensordash_ws_client=debug,sensordash_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}
