//! Read-only projections of a [`Snapshot`] for display.
//!
//! None of these touch the store; they are plain functions over a snapshot
//! (or a client) and can be recomputed on every notification.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::model::{ClientRecord, SensorReading};
use crate::store::Snapshot;

/// How sensors within a client are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOption {
    /// Sensor id, ascending.
    #[default]
    Name,
    /// First value, descending. Sensors without values go last.
    Value,
}

/// How flattened rows are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
    #[default]
    ClientId,
    /// Display type, e.g. all "Temperature" rows together.
    Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseViewError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl FromStr for SortOption {
    type Err = ParseViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "value" => Ok(Self::Value),
            _ => Err(ParseViewError {
                kind: "sort option",
                value: s.to_string(),
                expected: "name, value",
            }),
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Value => "value",
        })
    }
}

impl FromStr for GroupBy {
    type Err = ParseViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clientid" | "client-id" | "client" => Ok(Self::ClientId),
            "type" => Ok(Self::Type),
            _ => Err(ParseViewError {
                kind: "grouping",
                value: s.to_string(),
                expected: "client-id, type",
            }),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ClientId => "client-id",
            Self::Type => "type",
        })
    }
}

/// Sensors of `client`, ordered by `sort`.
pub fn sorted_sensors(client: &ClientRecord, sort: SortOption) -> Vec<&SensorReading> {
    let mut sensors: Vec<&SensorReading> = client.sensors.iter().collect();
    match sort {
        SortOption::Name => sensors.sort_by(|a, b| a.sensor_id.cmp(&b.sensor_id)),
        SortOption::Value => sensors.sort_by(|a, b| compare_value_desc(a.value(), b.value())),
    }
    sensors
}

fn compare_value_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One `(client, sensor, type, value)` line of the combined table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorRow {
    pub client_id: String,
    pub sensor_id: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: f64,
}

impl SensorRow {
    pub fn display_type(&self) -> &str {
        display_type(&self.value_type)
    }
}

/// Flatten every value of every sensor into rows, in snapshot order.
pub fn flatten_rows(snapshot: &Snapshot) -> Vec<SensorRow> {
    snapshot
        .iter()
        .flat_map(|client| {
            client.sensors.iter().flat_map(move |sensor| {
                sensor.values.iter().map(move |v| SensorRow {
                    client_id: client.client_id.clone(),
                    sensor_id: sensor.sensor_id.clone(),
                    value_type: v.value_type.clone(),
                    value: v.value,
                })
            })
        })
        .collect()
}

/// Group rows by key. Groups appear in the order their key is first seen.
pub fn group_rows(rows: Vec<SensorRow>, by: GroupBy) -> Vec<(String, Vec<SensorRow>)> {
    let mut groups: Vec<(String, Vec<SensorRow>)> = Vec::new();
    for row in rows {
        let key = match by {
            GroupBy::ClientId => row.client_id.clone(),
            GroupBy::Type => row.display_type().to_string(),
        };
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, group)) => group.push(row),
            None => groups.push((key, vec![row])),
        }
    }
    groups
}

/// Human label for the short value types devices send.
pub fn display_type(value_type: &str) -> &str {
    match value_type {
        "t" => "Temperature",
        "h" => "Humidity",
        "p" => "Pressure",
        other => other,
    }
}
