//! Wires a loaded configuration into running components

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use flow_actuators::{ActuatorCommand, ActuatorDescription, ActuatorRegistry};
use flow_config::FlowsConfig;
use flow_engine::{FlowEngine, FlowHandle};
use flow_sensors::clock::{spawn_clock, unix_seconds};
use flow_sensors::SensorStore;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::mirror::spawn_mirror;

/// The running deployment
pub struct FlowHost {
    pub sensors: Arc<SensorStore>,
    pub actuators: Arc<ActuatorRegistry>,
    pub engine: FlowEngine,
    tasks: Vec<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl FlowHost {
    /// Build the sensor store, actuator registry and engine
    ///
    /// Spawns the clock and the mirror loop when configured, so this must
    /// run inside a tokio runtime.
    pub fn from_config(config: &FlowsConfig) -> Self {
        let sensors = Arc::new(SensorStore::with_initial(
            config
                .sensors
                .iter()
                .filter_map(|(id, sensor)| sensor.initial.clone().map(|value| (id.clone(), value))),
        ));

        let actuators = Arc::new(ActuatorRegistry::new());
        let mut mirrors = HashMap::new();
        for (id, actuator) in &config.actuators {
            let mut description = ActuatorDescription::new(id.as_str());
            if let Some(range) = actuator.range() {
                description = description.with_range(range);
            }
            if let Some(name) = &actuator.name {
                description = description.with_name(name.as_str());
            }
            actuators.register_with_description(description, log_command);

            if let Some(sensor) = &actuator.mirror {
                mirrors.insert(id.clone(), sensor.clone());
            }
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut tasks = Vec::new();

        if !mirrors.is_empty() {
            tasks.push(spawn_mirror(
                actuators.subscribe(),
                sensors.clone(),
                mirrors,
                shutdown_tx.subscribe(),
            ));
        }

        if let Some(clock) = &config.clock {
            // Seed before the first tick so flows never see the sensor missing
            sensors.set(&clock.sensor, unix_seconds());
            tasks.push(spawn_clock(
                sensors.clone(),
                clock.sensor.as_str(),
                clock.interval(),
            ));
        }

        let engine = FlowEngine::new(sensors.clone(), actuators.clone(), config.engine.clone());

        info!(
            sensors = sensors.readings().len(),
            actuators = actuators.actuator_count(),
            "Flow host ready"
        );

        Self {
            sensors,
            actuators,
            engine,
            tasks,
            shutdown_tx,
        }
    }

    /// Start every configured flow in declaration order
    pub fn start_flows(&self, config: &FlowsConfig) -> Result<Vec<FlowHandle>> {
        config
            .flows
            .iter()
            .map(|(name, ast)| {
                self.engine
                    .start_named(name, ast.clone())
                    .with_context(|| format!("starting flow '{}'", name))
            })
            .collect()
    }

    /// Cancel all flows and stop background tasks
    pub async fn shutdown(self) {
        let cancelled = self.engine.shutdown();
        debug!(cancelled, "Cancelled running flows");

        let _ = self.shutdown_tx.send(());
        for task in self.tasks {
            task.abort();
            let _ = task.await;
        }
        info!("Flow host stopped");
    }
}

fn log_command(command: &ActuatorCommand) -> flow_core::ActuatorResult<()> {
    info!(
        actuator = %command.actuator,
        value = %command.value,
        "Actuator command"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use flow_core::Value;
    use flow_engine::FlowStatus;

    fn config(yaml: &str) -> FlowsConfig {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        let config = FlowsConfig::from_yaml_value(value, Path::new("test.yaml")).unwrap();
        config.validate().unwrap();
        config
    }

    async fn finished(handle: &FlowHandle) -> FlowStatus {
        tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("flow did not finish")
    }

    #[tokio::test]
    async fn test_initial_readings_and_actuators() {
        let config = config(
            r#"
sensors:
  temp: { initial: 21.5 }
  door: {}
actuators:
  heater: { name: Heater, min: 0, max: 1 }
"#,
        );
        let host = FlowHost::from_config(&config);

        assert_eq!(host.sensors.get("temp"), Some(Value::from(21.5)));
        assert_eq!(host.sensors.get("door"), None);

        let heater = host.actuators.get_actuator("heater").unwrap();
        assert_eq!(heater.name.as_deref(), Some("Heater"));
        assert!(host.actuators.send("heater", Value::from(3)).is_err());

        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_flows_run_to_completion() {
        let config = config(
            r#"
sensors:
  temp: { initial: 15 }
actuators:
  heater: {}
flows:
  warm_up:
    initBlockID: main
    blocks:
      main:
        - opcode: IF
          arguments:
            condition: { conditionType: BASE, sensor: temp, comparison: "<", value: 18 }
            instructions_true_case:
              - { opcode: SET, arguments: { actuator: heater, value: true } }
"#,
        );
        let host = FlowHost::from_config(&config);
        let handles = host.start_flows(&config).unwrap();

        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].name(), "warm_up");
        assert_eq!(finished(&handles[0]).await, FlowStatus::Halted);
        assert_eq!(host.actuators.last_value("heater"), Some(Value::Bool(true)));

        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_mirror_wakes_waiting_flow() {
        let config = config(
            r#"
sensors:
  valve_state: { initial: 0 }
actuators:
  valve: { mirror: valve_state }
  lamp: {}
flows:
  confirm:
    initBlockID: main
    blocks:
      main:
        - { opcode: SET, arguments: { actuator: valve, value: 1 } }
        - opcode: WAIT
          arguments:
            condition: { conditionType: BASE, sensor: valve_state, comparison: "=", value: 1 }
        - { opcode: SET, arguments: { actuator: lamp, value: "open" } }
"#,
        );
        let host = FlowHost::from_config(&config);
        let handles = host.start_flows(&config).unwrap();

        assert_eq!(finished(&handles[0]).await, FlowStatus::Halted);
        assert_eq!(host.sensors.get("valve_state"), Some(Value::from(1)));
        assert_eq!(
            host.actuators.last_value("lamp"),
            Some(Value::from("open"))
        );

        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_clock_seeded_before_flows() {
        let config = config(
            r#"
clock: { sensor: now, interval_ms: 50 }
actuators:
  alarm: {}
flows:
  stamp:
    initBlockID: main
    blocks:
      main:
        - opcode: WAIT
          arguments:
            condition: { conditionType: BASE, sensor: now, comparison: ">", value: 0 }
        - { opcode: SET, arguments: { actuator: alarm, value: true } }
"#,
        );
        let host = FlowHost::from_config(&config);
        let handles = host.start_flows(&config).unwrap();

        assert_eq!(finished(&handles[0]).await, FlowStatus::Halted);
        assert_eq!(host.actuators.last_value("alarm"), Some(Value::Bool(true)));

        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_cancels_waiting_flows() {
        let config = config(
            r#"
sensors:
  never: { initial: 0 }
flows:
  idle:
    initBlockID: main
    blocks:
      main:
        - opcode: WAIT
          arguments:
            condition: { conditionType: BASE, sensor: never, comparison: "=", value: 1 }
"#,
        );
        let host = FlowHost::from_config(&config);
        let handles = host.start_flows(&config).unwrap();
        let handle = handles[0].clone();

        host.shutdown().await;
        assert_eq!(finished(&handle).await, FlowStatus::Cancelled);
    }
}
