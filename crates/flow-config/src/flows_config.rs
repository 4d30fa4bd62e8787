//! Deployment configuration document

use std::path::Path;
use std::time::Duration;

use flow_ast::{Ast, DeviceCatalog, LoadError};
use flow_core::{ActuatorId, SensorId, Value, ValueRange};
use flow_engine::EngineConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::loader::ConfigLoader;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowsConfig {
    pub engine: EngineConfig,

    /// Declared sensors
    pub sensors: IndexMap<SensorId, SensorConfig>,

    /// Declared actuators
    pub actuators: IndexMap<ActuatorId, ActuatorConfig>,

    /// Optional time-derived sensor
    pub clock: Option<ClockConfig>,

    /// Programs to start, keyed by flow name
    pub flows: IndexMap<String, Ast>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    /// Reading published before any flow starts
    pub initial: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuatorConfig {
    pub name: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,

    /// Sensor that receives every value written to this actuator
    pub mirror: Option<SensorId>,
}

impl ActuatorConfig {
    /// Accepted range, `None` when neither bound is set
    pub fn range(&self) -> Option<ValueRange> {
        ValueRange::from_bounds(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    #[serde(default = "default_clock_sensor")]
    pub sensor: SensorId,

    #[serde(default = "default_clock_interval_ms")]
    pub interval_ms: u64,
}

fn default_clock_sensor() -> SensorId {
    "clock".to_string()
}

fn default_clock_interval_ms() -> u64 {
    1000
}

impl ClockConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            sensor: default_clock_sensor(),
            interval_ms: default_clock_interval_ms(),
        }
    }
}

impl FlowsConfig {
    /// Parse a resolved YAML document
    pub fn from_yaml_value(value: serde_yaml::Value, origin: &Path) -> ConfigResult<Self> {
        serde_yaml::from_value(value).map_err(|source| ConfigError::Schema {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Every sensor a flow may read and every actuator it may write
    ///
    /// Only sensors that hold a reading before any flow starts are listed:
    /// declared sensors with an `initial` value and the clock sensor. A
    /// mirror sensor needs its own `initial` entry under `sensors`.
    pub fn catalog(&self) -> DeviceCatalog {
        let mut catalog = DeviceCatalog::new();
        for (id, sensor) in &self.sensors {
            if sensor.initial.is_some() {
                catalog.add_sensor(id.as_str());
            }
        }
        for (id, actuator) in &self.actuators {
            catalog.add_actuator(id.as_str(), actuator.range());
        }
        if let Some(clock) = &self.clock {
            catalog.add_sensor(clock.sensor.as_str());
        }
        catalog
    }

    /// Whether `sensor` is declared, with or without a reading
    fn declares_sensor(&self, sensor: &str) -> bool {
        self.sensors.contains_key(sensor)
            || self
                .actuators
                .values()
                .any(|actuator| actuator.mirror.as_deref() == Some(sensor))
    }

    /// Check device declarations and every flow against them
    pub fn validate(&self) -> ConfigResult<()> {
        for (id, actuator) in &self.actuators {
            if let (Some(min), Some(max)) = (actuator.min, actuator.max) {
                if min > max {
                    return Err(ConfigError::ValidationFailed {
                        message: format!("actuator '{}' has min {} above max {}", id, min, max),
                    });
                }
            }
        }

        if let Some(clock) = &self.clock {
            if clock.interval_ms == 0 {
                return Err(ConfigError::ValidationFailed {
                    message: "clock interval_ms must be positive".to_string(),
                });
            }
        }

        let catalog = self.catalog();
        for (name, ast) in &self.flows {
            ast.validate_against(&catalog).map_err(|source| match source {
                LoadError::UnknownSensor { sensor, .. } if self.declares_sensor(&sensor) => {
                    ConfigError::UnseededSensor {
                        flow: name.clone(),
                        sensor,
                    }
                }
                source => ConfigError::InvalidFlow {
                    name: name.clone(),
                    source,
                },
            })?;
            debug!(flow = %name, instructions = ast.instruction_count(), "Flow validated");
        }

        Ok(())
    }
}

/// Load, resolve and validate a configuration file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<FlowsConfig> {
    let path = path.as_ref();
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut loader = ConfigLoader::new(base_dir);
    let value = loader.load_file(path.file_name().map(Path::new).unwrap_or(path))?;

    let config = FlowsConfig::from_yaml_value(value, path)?;
    config.validate()?;

    info!(
        path = %path.display(),
        sensors = config.sensors.len(),
        actuators = config.actuators.len(),
        flows = config.flows.len(),
        "Loaded flow configuration"
    );
    Ok(config)
}
