//! Copies actuator writes into sensors
//!
//! Lets a deployment simulate devices whose state is observable: a write to
//! actuator `valve` shows up as a reading of its mirror sensor.

use std::collections::HashMap;
use std::sync::Arc;

use flow_actuators::ActuatorCommand;
use flow_core::{ActuatorId, SensorId};
use flow_sensors::SensorStore;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawn the mirror loop
///
/// Runs until `shutdown` fires or the command channel closes.
pub fn spawn_mirror(
    mut commands: broadcast::Receiver<ActuatorCommand>,
    sensors: Arc<SensorStore>,
    mirrors: HashMap<ActuatorId, SensorId>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    info!(count = mirrors.len(), "Starting actuator mirror");

    tokio::spawn(async move {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Ok(command) => {
                            if let Some(sensor) = mirrors.get(&command.actuator) {
                                debug!(
                                    actuator = %command.actuator,
                                    sensor = %sensor,
                                    "Mirroring write"
                                );
                                sensors.set(sensor, command.value);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Actuator mirror lagged by {} commands", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("Actuator registry closed, stopping mirror");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    debug!("Mirror received shutdown signal");
                    break;
                }
            }
        }
    })
}
