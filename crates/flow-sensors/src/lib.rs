//! Sensor store for flow automation
//!
//! The [`SensorStore`] holds the latest reading of every sensor and publishes
//! a new, versioned [`Snapshot`] to subscribers on each update. Running flows
//! consume it through the [`SensorSource`] trait.

pub mod clock;

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use flow_core::{SensorId, SensorSource, Snapshot, Value};
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

/// Default channel capacity for snapshot updates
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Latest sensor readings plus update fan-out
pub struct SensorStore {
    /// Current snapshot, replaced on every update
    current: RwLock<Snapshot>,
    /// Subscribers receive every new snapshot in version order
    sender: broadcast::Sender<Snapshot>,
}

impl SensorStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create an empty store with a custom update channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            current: RwLock::new(Snapshot::default()),
            sender,
        }
    }

    /// Create a store pre-populated with readings
    pub fn with_initial<I, K, V>(readings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<SensorId>,
        V: Into<Value>,
    {
        let store = Self::new();
        *store.current.write().unwrap_or_else(PoisonError::into_inner) =
            readings.into_iter().collect();
        store
    }

    /// Record a reading and publish the resulting snapshot
    #[instrument(skip(self, value), fields(sensor = %sensor))]
    pub fn set(&self, sensor: &str, value: impl Into<Value>) -> Snapshot {
        let value = value.into();
        debug!(value = %value, "Sensor reading");
        self.publish(|current| current.with(sensor, value))
    }

    /// Record several readings as a single snapshot version
    pub fn set_many<I, K, V>(&self, readings: I) -> Snapshot
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<SensorId>,
        V: Into<Value>,
    {
        let readings: Vec<(SensorId, Value)> = readings
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        debug!(count = readings.len(), "Sensor readings");
        self.publish(|current| current.with_many(readings))
    }

    /// Drop a sensor from future snapshots
    #[instrument(skip(self), fields(sensor = %sensor))]
    pub fn remove(&self, sensor: &str) -> Option<Value> {
        let previous = self.get(sensor)?;
        trace!("Removing sensor");
        self.publish(|current| current.without(sensor));
        Some(previous)
    }

    /// Latest reading of one sensor
    pub fn get(&self, sensor: &str) -> Option<Value> {
        self.read().get(sensor).cloned()
    }

    /// Current readings keyed by sensor
    pub fn readings(&self) -> HashMap<SensorId, Value> {
        self.read()
            .iter()
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn read(&self) -> Snapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in the next snapshot and broadcast it while holding the write
    /// lock, so channel order always matches version order.
    fn publish(&self, next: impl FnOnce(&Snapshot) -> Snapshot) -> Snapshot {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let snapshot = next(&current);
        *current = snapshot.clone();

        trace!(version = snapshot.version(), "Publishing snapshot");
        // No subscribers is fine
        let _ = self.sender.send(snapshot.clone());
        snapshot
    }
}

impl Default for SensorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSource for SensorStore {
    fn snapshot(&self) -> Snapshot {
        self.read()
    }

    fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.sender.subscribe()
    }
}
