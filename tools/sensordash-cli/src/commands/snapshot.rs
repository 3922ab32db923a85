//! Snapshot Command - print the current sensor state once

use std::time::Duration;

use clap::Args;
use sensordash_core::{GroupBy, SortOption};

use super::ConnectArgs;
use crate::error::{CliError, CliResult};
use crate::output::{self, OutputFormat, ViewOptions};

/// Connect, collect readings for a moment, print them once
#[derive(Debug, Args)]
pub struct SnapshotCommand {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// How long to collect readings before printing
    #[arg(short, long, default_value = "1500")]
    pub wait_ms: u64,

    /// Sort sensors within a client by name or by value
    #[arg(short, long, default_value_t = SortOption::Name)]
    pub sort: SortOption,

    /// Combine rows grouped by client-id or type
    #[arg(short, long)]
    pub group_by: Option<GroupBy>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl SnapshotCommand {
    pub async fn execute(self) -> CliResult<()> {
        let connection = self.connect.connect()?;
        tokio::time::sleep(Duration::from_millis(self.wait_ms)).await;

        let snapshot = connection.client_sensors();
        connection.disconnect();

        if snapshot.is_empty() {
            return Err(CliError::NoData {
                url: self.connect.url,
                waited_ms: self.wait_ms,
            });
        }

        let view = ViewOptions {
            sort: self.sort,
            group_by: self.group_by,
        };
        println!("{}", output::render(&snapshot, self.format, view)?);
        Ok(())
    }
}
