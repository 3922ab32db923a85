//! The shared sensor store.
//!
//! [`SensorHub`] owns the current [`Snapshot`], its revision counter, the
//! bounded history and the observer registry. It is cheap to clone and safe
//! to share between the transport task and any number of readers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::history::{History, ValueSeries};
use crate::model::SensorUpdate;
use crate::observer::{ObserverRegistry, Subscription};
use crate::store::Snapshot;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

struct HubState {
    snapshot: Snapshot,
    revision: u64,
    epoch: u64,
    history: History,
}

struct HubInner {
    state: Mutex<HubState>,
    observers: ObserverRegistry<Snapshot>,
}

/// Latest sensor state plus change notification.
///
/// Every [`apply`](Self::apply) publishes a new snapshot and notifies all
/// observers, even when the values did not change. A new observer is called
/// right away with the current snapshot, which is empty before the first
/// update.
///
/// A writer that may be superseded (a connection session) tags its updates
/// with an epoch via [`apply_in_epoch`](Self::apply_in_epoch); once
/// [`begin_epoch`](Self::begin_epoch) moves past it, those updates are
/// refused under the same lock that merges them.
#[derive(Clone)]
pub struct SensorHub {
    inner: Arc<HubInner>,
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorHub {
    pub fn new() -> Self {
        Self::with_history_capacity(crate::history::DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a hub keeping `capacity` samples per series (0 disables history).
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                state: Mutex::new(HubState {
                    snapshot: Snapshot::new(),
                    revision: 0,
                    epoch: 0,
                    history: History::with_capacity(capacity),
                }),
                observers: ObserverRegistry::new(),
            }),
        }
    }

    /// Merge `update`, publish the result and notify observers.
    pub fn apply(&self, update: SensorUpdate) -> Snapshot {
        let (snapshot, revision) = {
            let mut state = self.lock();
            Self::merge(&mut state, &update)
        };
        self.publish(&update, snapshot, revision)
    }

    /// Like [`apply`](Self::apply), but only while the hub is still in
    /// `epoch`. Returns `None` and leaves the state untouched otherwise.
    pub fn apply_in_epoch(&self, epoch: u64, update: SensorUpdate) -> Option<Snapshot> {
        let (snapshot, revision) = {
            let mut state = self.lock();
            if state.epoch != epoch {
                return None;
            }
            Self::merge(&mut state, &update)
        };
        Some(self.publish(&update, snapshot, revision))
    }

    /// Move to `epoch`, refusing later `apply_in_epoch` calls for any earlier
    /// one. Epochs never go backwards.
    pub fn begin_epoch(&self, epoch: u64) {
        let mut state = self.lock();
        state.epoch = state.epoch.max(epoch);
    }

    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    fn merge(state: &mut HubState, update: &SensorUpdate) -> (Snapshot, u64) {
        state.snapshot = state.snapshot.apply(update);
        state.revision += 1;
        state.history.record(update);
        (state.snapshot.clone(), state.revision)
    }

    fn publish(&self, _update: &SensorUpdate, snapshot: Snapshot, revision: u64) -> Snapshot {
        #[cfg(feature = "tracing")]
        trace!(
            client = %_update.client_id,
            sensor = %_update.sensor_id,
            revision,
            "Applied sensor update"
        );

        self.inner.observers.notify(revision, &snapshot);
        snapshot
    }

    /// Register an observer.
    ///
    /// The observer is called once, before this returns, with the current
    /// snapshot, then on every later update.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let subscription = self.inner.observers.subscribe(callback);
        let (snapshot, revision) = {
            let state = self.lock();
            (state.snapshot.clone(), state.revision)
        };
        self.inner
            .observers
            .replay(&subscription, revision, &snapshot);
        subscription
    }

    /// The current snapshot.
    pub fn client_sensors(&self) -> Snapshot {
        self.lock().snapshot.clone()
    }

    /// Number of published snapshots so far.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Recent samples for one sensor, one series per value type.
    pub fn history(&self, client_id: &str, sensor_id: &str) -> Vec<ValueSeries> {
        self.lock().history.series(client_id, sensor_id)
    }

    /// Drop all state and history, then notify observers with the empty snapshot.
    pub fn reset(&self) {
        let (snapshot, revision) = {
            let mut state = self.lock();
            state.snapshot = Snapshot::new();
            state.revision += 1;
            state.history.clear();
            (state.snapshot.clone(), state.revision)
        };

        #[cfg(feature = "tracing")]
        debug!(revision, "Sensor state reset");

        self.inner.observers.notify(revision, &snapshot);
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SensorHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SensorHub")
            .field("clients", &state.snapshot.len())
            .field("revision", &state.revision)
            .field("epoch", &state.epoch)
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}
