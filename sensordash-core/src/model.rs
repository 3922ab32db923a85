//! Sensor data model.
//!
//! Every sensor holds an ordered list of `(type, value)` pairs. A sensor that
//! reports a bare scalar is a list of one pair typed [`DEFAULT_VALUE_TYPE`],
//! so single- and multi-valued sensors go through the same code paths.

use serde::Serialize;

pub use sensordash_ws_protocol::DEFAULT_VALUE_TYPE;

/// One measured quantity of a sensor, e.g. `("t", 21.5)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorValue {
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: f64,
}

impl SensorValue {
    pub fn new(value_type: impl Into<String>, value: f64) -> Self {
        Self {
            value_type: value_type.into(),
            value,
        }
    }

    /// A value carrying the default type.
    pub fn scalar(value: f64) -> Self {
        Self::new(DEFAULT_VALUE_TYPE, value)
    }
}

/// Latest values of one sensor on one client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub sensor_id: String,
    pub values: Vec<SensorValue>,
}

impl SensorReading {
    pub fn new(sensor_id: impl Into<String>, values: Vec<SensorValue>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            values,
        }
    }

    /// First value, for consumers that treat every sensor as a scalar.
    pub fn value(&self) -> Option<f64> {
        self.values.first().map(|v| v.value)
    }

    /// Value of the given type, if the sensor reports it.
    pub fn value_of(&self, value_type: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.value_type == value_type)
            .map(|v| v.value)
    }
}

/// One reporting device and its sensors, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub client_id: String,
    pub sensors: Vec<SensorReading>,
}

impl ClientRecord {
    pub fn sensor(&self, sensor_id: &str) -> Option<&SensorReading> {
        self.sensors.iter().find(|s| s.sensor_id == sensor_id)
    }
}

/// A decoded change: new values for one `(client, sensor)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorUpdate {
    pub client_id: String,
    pub sensor_id: String,
    pub values: Vec<SensorValue>,
    /// Wall-clock arrival time in milliseconds; only the history window reads it.
    pub received_at_ms: u64,
}

impl SensorUpdate {
    /// Create an update stamped with the current time.
    pub fn new(
        client_id: impl Into<String>,
        sensor_id: impl Into<String>,
        values: Vec<SensorValue>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            sensor_id: sensor_id.into(),
            values,
            received_at_ms: now_ms(),
        }
    }

    /// Create a single-scalar update.
    pub fn scalar(client_id: impl Into<String>, sensor_id: impl Into<String>, value: f64) -> Self {
        Self::new(client_id, sensor_id, vec![SensorValue::scalar(value)])
    }

    /// Override the arrival timestamp.
    pub fn at(mut self, received_at_ms: u64) -> Self {
        self.received_at_ms = received_at_ms;
        self
    }
}

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
