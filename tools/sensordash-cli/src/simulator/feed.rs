//! Random-walk sensor readings for the simulated clients.

use rand::Rng;
use sensordash_ws_protocol::{InboundFrame, TypedValue};

/// One simulated quantity and the band it wanders in.
#[derive(Debug, Clone, Copy)]
pub struct SensorBand {
    pub sensor_id: &'static str,
    pub value_type: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Every simulated client reports these three sensors.
pub const SENSORS: [SensorBand; 3] = [
    SensorBand {
        sensor_id: "temperature",
        value_type: "t",
        min: 20.0,
        max: 35.0,
    },
    SensorBand {
        sensor_id: "humidity",
        value_type: "h",
        min: 30.0,
        max: 70.0,
    },
    SensorBand {
        sensor_id: "pressure",
        value_type: "p",
        min: 980.0,
        max: 1020.0,
    },
];

/// Largest single step, as a fraction of the band.
const STEP_FRACTION: f64 = 0.05;

/// A frame ready to send, with its topic kept for subscription matching.
#[derive(Debug, Clone)]
pub struct FeedFrame {
    pub topic: String,
    pub text: String,
}

/// Current readings of every simulated client.
#[derive(Debug)]
pub struct Feed {
    prefix: String,
    clients: Vec<(String, [f64; SENSORS.len()])>,
}

impl Feed {
    /// `count` clients named `client1..=clientN`, each starting at a random
    /// point in every band.
    pub fn new<R: Rng>(prefix: impl Into<String>, count: usize, rng: &mut R) -> Self {
        let clients = (1..=count)
            .map(|n| {
                let values = SENSORS.map(|band| rng.gen_range(band.min..=band.max));
                (format!("client{n}"), values)
            })
            .collect();
        Self {
            prefix: prefix.into(),
            clients,
        }
    }

    /// Move every reading one step and emit a frame per (client, sensor).
    pub fn tick<R: Rng>(&mut self, rng: &mut R) -> Result<Vec<FeedFrame>, serde_json::Error> {
        let mut frames = Vec::with_capacity(self.clients.len() * SENSORS.len());
        for (client_id, values) in &mut self.clients {
            for (band, value) in SENSORS.iter().zip(values.iter_mut()) {
                let step = (band.max - band.min) * STEP_FRACTION;
                *value = (*value + rng.gen_range(-step..=step)).clamp(band.min, band.max);

                let reading = [TypedValue::new(band.value_type, round2(*value))];
                let frame = InboundFrame::sensor(&self.prefix, client_id, band.sensor_id, &reading)?;
                frames.push(FeedFrame {
                    topic: format!("{}/{}/{}", self.prefix, client_id, band.sensor_id),
                    text: serde_json::to_string(&frame)?,
                });
            }
        }
        Ok(frames)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
