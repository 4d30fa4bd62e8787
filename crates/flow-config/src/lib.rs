//! Configuration for flow deployments
//!
//! A deployment is described by one YAML document declaring sensors,
//! actuators, engine settings and the flows to run. Documents may be split
//! across files with custom tags:
//!
//! - `!include path` - Include another YAML (or JSON) file
//! - `!include_dir_named dir` - Include every file in a directory as a
//!   mapping keyed by file stem
//! - `!env_var NAME [default]` - Substitute an environment variable
//!
//! # Example
//!
//! ```yaml
//! engine:
//!   actuator_errors: fail
//! sensors:
//!   moisture: { initial: 50 }
//! actuators:
//!   valve: { min: 0, max: 1 }
//! clock:
//!   sensor: now
//!   interval_ms: 500
//! flows:
//!   irrigation: !include flows/irrigation.json
//! ```

mod error;
mod flows_config;
mod loader;

pub use error::{ConfigError, ConfigResult};
pub use flows_config::{load_config, ActuatorConfig, ClockConfig, FlowsConfig, SensorConfig};
pub use loader::{load_yaml, ConfigLoader};
