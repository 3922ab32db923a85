//! Table Output Formatting

use colored::Colorize;
use sensordash_core::view::{self, SensorRow};
use sensordash_core::{ClientRecord, Snapshot};
use tabled::{builder::Builder, settings::Style};

use super::ViewOptions;

/// Format a whole snapshot, either one table per client or grouped rows.
pub fn format_snapshot(snapshot: &Snapshot, options: ViewOptions) -> String {
    if snapshot.is_empty() {
        return "No sensor data yet".dimmed().to_string();
    }

    match options.group_by {
        None => snapshot
            .iter()
            .map(|client| format_client(client, options))
            .collect::<Vec<_>>()
            .join("\n"),
        Some(group_by) => view::group_rows(view::flatten_rows(snapshot), group_by)
            .into_iter()
            .map(|(key, rows)| format_group(&key, &rows))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Format one client's sensors as a table
pub fn format_client(client: &ClientRecord, options: ViewOptions) -> String {
    let mut builder = Builder::default();
    builder.push_record(vec!["Sensor", "Type", "Value"]);

    for sensor in view::sorted_sensors(client, options.sort) {
        if sensor.values.is_empty() {
            builder.push_record(vec![
                sensor.sensor_id.clone(),
                "-".dimmed().to_string(),
                "-".dimmed().to_string(),
            ]);
        }
        for value in &sensor.values {
            builder.push_record(vec![
                sensor.sensor_id.clone(),
                view::display_type(&value.value_type).to_string(),
                format_value(value.value),
            ]);
        }
    }

    format!(
        "{}\n{}\n",
        client.client_id.bold(),
        builder.build().with(Style::modern())
    )
}

/// Format grouped rows under a heading
fn format_group(key: &str, rows: &[SensorRow]) -> String {
    let mut builder = Builder::default();
    builder.push_record(vec!["Client", "Sensor", "Type", "Value"]);

    for row in rows {
        builder.push_record(vec![
            row.client_id.clone(),
            row.sensor_id.clone(),
            row.display_type().to_string(),
            format_value(row.value),
        ]);
    }

    format!("{}\n{}\n", key.bold(), builder.build().with(Style::modern()))
}

fn format_value(value: f64) -> String {
    format!("{value:.2}").cyan().to_string()
}
