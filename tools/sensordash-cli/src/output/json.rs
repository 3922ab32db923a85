//! JSON Output Formatting
//!
//! Without grouping the snapshot is emitted as-is (`[{clientId, sensors}]`).
//! With `--group-by` the flattened rows are emitted per group instead.

use sensordash_core::{view, SensorRow, Snapshot};
use serde::Serialize;

use super::ViewOptions;

#[derive(Serialize)]
struct Group<'a> {
    group: &'a str,
    rows: &'a [SensorRow],
}

/// Format a snapshot as JSON, pretty-printed or on a single line.
pub fn format_snapshot(
    snapshot: &Snapshot,
    view: ViewOptions,
    pretty: bool,
) -> Result<String, serde_json::Error> {
    match view.group_by {
        None => encode(snapshot, pretty),
        Some(group_by) => {
            let groups = view::group_rows(view::flatten_rows(snapshot), group_by);
            let groups: Vec<Group<'_>> = groups
                .iter()
                .map(|(key, rows)| Group { group: key, rows })
                .collect();
            encode(&groups, pretty)
        }
    }
}

fn encode<T: Serialize + ?Sized>(data: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(data)
    } else {
        serde_json::to_string(data)
    }
}
