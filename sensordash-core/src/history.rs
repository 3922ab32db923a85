//! Bounded per-sensor time series.
//!
//! The live snapshot only keeps the latest values. Trend charts need the last
//! N samples per value type, which are recorded here alongside the snapshot
//! but never inside it.

use std::collections::VecDeque;

use serde::Serialize;

use crate::model::SensorUpdate;

/// Samples kept per `(client, sensor, type)` unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One sample of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedValue {
    pub timestamp_ms: u64,
    pub value: f64,
}

/// Samples of one value type, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSeries {
    #[serde(rename = "type")]
    pub value_type: String,
    pub samples: Vec<TimedValue>,
}

#[derive(Debug)]
struct SensorHistory {
    client_id: String,
    sensor_id: String,
    series: Vec<(String, VecDeque<TimedValue>)>,
}

/// Ring buffers keyed by `(client, sensor)`, one per value type.
#[derive(Debug)]
pub struct History {
    capacity: usize,
    sensors: Vec<SensorHistory>,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// A capacity of 0 disables recording.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            sensors: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&mut self, update: &SensorUpdate) {
        if self.capacity == 0 {
            return;
        }

        let index = match self
            .sensors
            .iter()
            .position(|h| h.client_id == update.client_id && h.sensor_id == update.sensor_id)
        {
            Some(index) => index,
            None => {
                self.sensors.push(SensorHistory {
                    client_id: update.client_id.clone(),
                    sensor_id: update.sensor_id.clone(),
                    series: Vec::new(),
                });
                self.sensors.len() - 1
            }
        };
        let sensor = &mut self.sensors[index];

        for value in &update.values {
            let samples = match sensor
                .series
                .iter_mut()
                .position(|(t, _)| *t == value.value_type)
            {
                Some(pos) => &mut sensor.series[pos].1,
                None => {
                    sensor
                        .series
                        .push((value.value_type.clone(), VecDeque::new()));
                    let last = sensor.series.len() - 1;
                    &mut sensor.series[last].1
                }
            };
            if samples.len() == self.capacity {
                samples.pop_front();
            }
            samples.push_back(TimedValue {
                timestamp_ms: update.received_at_ms,
                value: value.value,
            });
        }
    }

    /// Series for one sensor, in first-seen type order. Empty when unknown.
    pub fn series(&self, client_id: &str, sensor_id: &str) -> Vec<ValueSeries> {
        self.sensors
            .iter()
            .find(|h| h.client_id == client_id && h.sensor_id == sensor_id)
            .map(|h| {
                h.series
                    .iter()
                    .map(|(value_type, samples)| ValueSeries {
                        value_type: value_type.clone(),
                        samples: samples.iter().copied().collect(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.sensors.clear();
    }
}
