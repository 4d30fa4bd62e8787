//! Actuator registry for flow automation
//!
//! The [`ActuatorRegistry`] maps actuator ids to write handlers. Flows write
//! through the [`ActuatorSink`] trait; every accepted command is recorded as
//! the actuator's last value and broadcast to subscribers.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use flow_core::{ActuatorError, ActuatorId, ActuatorResult, ActuatorSink, Value, ValueRange};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

/// Default channel capacity for command fan-out
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Handler invoked for each command sent to an actuator
///
/// Handlers run synchronously on the caller's task and should hand the
/// command off to the device rather than wait for it.
pub type ActuatorHandler = Arc<dyn Fn(&ActuatorCommand) -> ActuatorResult<()> + Send + Sync>;

/// A set-command delivered to an actuator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    pub actuator: ActuatorId,
    pub value: Value,
    pub issued_at: DateTime<Utc>,
}

impl ActuatorCommand {
    pub fn new(actuator: impl Into<ActuatorId>, value: Value) -> Self {
        Self {
            actuator: actuator.into(),
            value,
            issued_at: Utc::now(),
        }
    }
}

/// Information about a registered actuator
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorDescription {
    pub id: ActuatorId,
    /// Human-readable name
    pub name: Option<String>,
    /// Accepted numeric range, `None` accepts any value
    pub range: Option<ValueRange>,
}

impl ActuatorDescription {
    pub fn new(id: impl Into<ActuatorId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            range: None,
        }
    }

    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

struct RegisteredActuator {
    handler: ActuatorHandler,
    description: ActuatorDescription,
}

/// Registry of actuators and their write handlers
pub struct ActuatorRegistry {
    actuators: DashMap<ActuatorId, RegisteredActuator>,
    last_values: DashMap<ActuatorId, Value>,
    sender: broadcast::Sender<ActuatorCommand>,
}

impl ActuatorRegistry {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            actuators: DashMap::new(),
            last_values: DashMap::new(),
            sender,
        }
    }

    /// Register an actuator without range limits
    pub fn register<F>(&self, actuator: impl Into<ActuatorId>, handler: F)
    where
        F: Fn(&ActuatorCommand) -> ActuatorResult<()> + Send + Sync + 'static,
    {
        self.register_with_description(ActuatorDescription::new(actuator), handler);
    }

    /// Register an actuator with a full description
    #[instrument(skip(self, handler), fields(actuator = %description.id))]
    pub fn register_with_description<F>(&self, description: ActuatorDescription, handler: F)
    where
        F: Fn(&ActuatorCommand) -> ActuatorResult<()> + Send + Sync + 'static,
    {
        debug!(range = ?description.range, "Registering actuator");

        self.actuators.insert(
            description.id.clone(),
            RegisteredActuator {
                handler: Arc::new(handler),
                description,
            },
        );
    }

    /// Remove an actuator, returns whether it existed
    #[instrument(skip(self))]
    pub fn unregister(&self, actuator: &str) -> bool {
        let removed = self.actuators.remove(actuator).is_some();
        if removed {
            self.last_values.remove(actuator);
            debug!("Unregistered actuator");
        }
        removed
    }

    pub fn has_actuator(&self, actuator: &str) -> bool {
        self.actuators.contains_key(actuator)
    }

    pub fn get_actuator(&self, actuator: &str) -> Option<ActuatorDescription> {
        self.actuators.get(actuator).map(|a| a.description.clone())
    }

    /// All registered actuator ids, sorted
    pub fn actuator_ids(&self) -> Vec<ActuatorId> {
        let mut ids: Vec<_> = self.actuators.iter().map(|a| a.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Last value accepted by an actuator
    pub fn last_value(&self, actuator: &str) -> Option<Value> {
        self.last_values.get(actuator).map(|v| v.clone())
    }

    /// Subscribe to accepted commands
    pub fn subscribe(&self) -> broadcast::Receiver<ActuatorCommand> {
        self.sender.subscribe()
    }

    pub fn actuator_count(&self) -> usize {
        self.actuators.len()
    }

    /// Send a value to an actuator
    ///
    /// Numeric values are checked against the actuator's range before the
    /// handler runs.
    pub fn send(&self, actuator: &str, value: Value) -> ActuatorResult<()> {
        let registered = self.actuators.get(actuator).ok_or_else(|| {
            warn!(actuator = %actuator, "Actuator not found");
            ActuatorError::NotFound(actuator.to_string())
        })?;

        if let (Some(range), Some(number)) = (registered.description.range, value.as_number()) {
            if !range.contains(number) {
                return Err(ActuatorError::OutOfRange {
                    actuator: actuator.to_string(),
                    value: number,
                    min: range.min,
                    max: range.max,
                });
            }
        }

        let handler = registered.handler.clone();
        drop(registered); // Release the shard lock before running the handler

        let command = ActuatorCommand::new(actuator, value);
        debug!(actuator = %actuator, value = %command.value, "Sending actuator command");
        handler(&command)?;

        self.last_values
            .insert(command.actuator.clone(), command.value.clone());
        // No subscribers is fine
        let _ = self.sender.send(command);
        Ok(())
    }
}

impl Default for ActuatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorSink for ActuatorRegistry {
    fn set(&self, actuator: &str, value: &Value) -> ActuatorResult<()> {
        self.send(actuator, value.clone())
    }
}

/// Thread-safe wrapper for ActuatorRegistry
pub type SharedActuatorRegistry = Arc<ActuatorRegistry>;
