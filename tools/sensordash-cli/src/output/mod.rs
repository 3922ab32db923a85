//! Output Formatting
//!
//! This module provides the output formats shared by `watch` and `snapshot`.

pub mod json;
pub mod live;
pub mod table;

use sensordash_core::{GroupBy, Snapshot, SortOption};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One table per client, or per group
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact JSON (one line per snapshot)
    JsonCompact,
}

/// How a snapshot is laid out in table form.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewOptions {
    pub sort: SortOption,
    /// `None` renders one table per client.
    pub group_by: Option<GroupBy>,
}

/// Render `snapshot` in `format`.
pub fn render(
    snapshot: &Snapshot,
    format: OutputFormat,
    view: ViewOptions,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Table => Ok(table::format_snapshot(snapshot, view)),
        OutputFormat::Json => json::format_snapshot(snapshot, view, true),
        OutputFormat::JsonCompact => json::format_snapshot(snapshot, view, false),
    }
}
