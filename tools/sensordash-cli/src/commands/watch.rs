//! Watch Command - Real-time Sensor Monitoring

use std::io::Write;

use clap::Args;
use sensordash_core::{GroupBy, Snapshot, SortOption};
use tokio::signal;
use tokio::sync::mpsc;

use super::ConnectArgs;
use crate::error::CliResult;
use crate::output::{self, live, OutputFormat, ViewOptions};

/// Watch live sensor values
#[derive(Debug, Args)]
pub struct WatchCommand {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Sort sensors within a client by name or by value
    #[arg(short, long, default_value_t = SortOption::Name)]
    pub sort: SortOption,

    /// Combine rows grouped by client-id or type
    #[arg(short, long)]
    pub group_by: Option<GroupBy>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Maximum number of updates to print (0 = unlimited)
    #[arg(short, long, default_value = "0")]
    pub count: u64,
}

impl WatchCommand {
    pub async fn execute(self) -> CliResult<()> {
        watch_sensors(self).await
    }
}

async fn watch_sensors(cmd: WatchCommand) -> CliResult<()> {
    let connection = cmd.connect.connect()?;
    let table = cmd.format == OutputFormat::Table;

    if table {
        live::print_watch_start(&cmd.connect.url, &cmd.connect.subscribe);
    }

    // Observers run on the connection task; hand snapshots over to this one.
    let (snapshot_tx, mut snapshot_rx) = mpsc::unbounded_channel::<Snapshot>();
    let subscription = connection.subscribe(move |snapshot| {
        let _ = snapshot_tx.send(snapshot.clone());
    });
    let mut status_rx = connection.status_changes();

    // Set up Ctrl+C handler
    let (cancel_tx, mut cancel_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(());
        }
    });

    let view = ViewOptions {
        sort: cmd.sort,
        group_by: cmd.group_by,
    };
    let mut count = 0u64;
    let unlimited = cmd.count == 0;
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            Some(snapshot) = snapshot_rx.recv() => {
                // The replay on subscribe is empty until the first reading.
                if snapshot.is_empty() {
                    continue;
                }
                count += 1;
                if table {
                    println!(
                        "{}",
                        live::format_update_header(
                            count,
                            snapshot.len(),
                            snapshot.sensor_count(),
                            chrono::Local::now()
                        )
                    );
                }
                writeln!(stdout, "{}", output::render(&snapshot, cmd.format, view)?)?;

                if !unlimited && count >= cmd.count {
                    break;
                }
            }
            Ok(()) = status_rx.changed() => {
                let status = *status_rx.borrow_and_update();
                tracing::debug!("Connection status: {}", status);
                if table {
                    live::print_status(status);
                }
            }
            _ = &mut cancel_rx => {
                // User pressed Ctrl+C
                break;
            }
        }
    }

    subscription.unsubscribe();
    connection.disconnect();

    if table {
        live::print_watch_stop();
    }

    Ok(())
}
