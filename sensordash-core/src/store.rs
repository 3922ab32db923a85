//! Copy-on-write sensor state.
//!
//! A [`Snapshot`] is never mutated. [`Snapshot::apply`] returns a new value
//! that shares every untouched [`ClientRecord`] with its predecessor, so an
//! observer holding the old snapshot keeps a consistent view and a consumer
//! can detect "nothing changed for this client" with [`Arc::ptr_eq`].

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::model::{ClientRecord, SensorReading, SensorUpdate};

/// Immutable view of every client and its latest sensor values.
///
/// Clients appear in first-seen order; sensors within a client likewise.
/// Cloning is an `Arc` bump.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    clients: Arc<Vec<Arc<ClientRecord>>>,
}

impl Snapshot {
    /// The empty state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn clients(&self) -> &[Arc<ClientRecord>] {
        &self.clients
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientRecord> {
        self.clients.iter().map(|c| c.as_ref())
    }

    pub fn client(&self, client_id: &str) -> Option<&Arc<ClientRecord>> {
        self.clients.iter().find(|c| c.client_id == client_id)
    }

    pub fn sensor(&self, client_id: &str, sensor_id: &str) -> Option<&SensorReading> {
        self.client(client_id)?.sensor(sensor_id)
    }

    /// Total number of sensors across all clients.
    pub fn sensor_count(&self) -> usize {
        self.clients.iter().map(|c| c.sensors.len()).sum()
    }

    /// Reference equality: `true` when both handles point at the same state.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.clients, &other.clients)
    }

    /// Merge one update into a new snapshot.
    ///
    /// - unknown client: appended with the single sensor
    /// - known client, unknown sensor: sensor appended to that client
    /// - known client and sensor: values replaced in place
    ///
    /// Only the touched client is rebuilt; all others are shared.
    pub fn apply(&self, update: &SensorUpdate) -> Snapshot {
        let mut clients: Vec<Arc<ClientRecord>> = self.clients.as_ref().clone();

        match clients
            .iter()
            .position(|c| c.client_id == update.client_id)
        {
            Some(index) => {
                let mut client = clients[index].as_ref().clone();
                merge_sensor(&mut client, update);
                clients[index] = Arc::new(client);
            }
            None => clients.push(Arc::new(ClientRecord {
                client_id: update.client_id.clone(),
                sensors: vec![SensorReading::new(
                    update.sensor_id.clone(),
                    update.values.clone(),
                )],
            })),
        }

        Snapshot {
            clients: Arc::new(clients),
        }
    }
}

fn merge_sensor(client: &mut ClientRecord, update: &SensorUpdate) {
    match client
        .sensors
        .iter_mut()
        .find(|s| s.sensor_id == update.sensor_id)
    {
        Some(sensor) => sensor.values = update.values.clone(),
        None => client.sensors.push(SensorReading::new(
            update.sensor_id.clone(),
            update.values.clone(),
        )),
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.iter().eq(other.iter())
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl FromIterator<SensorUpdate> for Snapshot {
    fn from_iter<I: IntoIterator<Item = SensorUpdate>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Snapshot::new(), |snapshot, update| snapshot.apply(&update))
    }
}
