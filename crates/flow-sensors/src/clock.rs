//! Time-derived sensor
//!
//! Publishes the current Unix time so that flows can express bounded waits
//! as ordinary conditions, e.g. `ANY(door = true, clock >= deadline)`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::SensorStore;

/// Current Unix time in seconds, with sub-second precision
pub fn unix_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Spawn a task that writes [`unix_seconds`] to `sensor` every `interval`
///
/// The first reading is published immediately. Abort the returned handle to
/// stop the clock.
pub fn spawn_clock(
    store: Arc<SensorStore>,
    sensor: impl Into<String>,
    interval: Duration,
) -> JoinHandle<()> {
    let sensor = sensor.into();
    info!(sensor = %sensor, interval_ms = interval.as_millis() as u64, "Starting clock sensor");

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let now = unix_seconds();
            store.set(&sensor, now);
            debug!(sensor = %sensor, now, "Clock tick");
        }
    })
}
