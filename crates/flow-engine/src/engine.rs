//! Flow engine: starts, tracks and stops flows

use std::sync::Arc;

use dashmap::DashMap;
use flow_ast::{Ast, LoadResult};
use flow_core::{ActuatorSink, SensorSource, Snapshot};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::EngineConfig;
use crate::error::FlowResult;
use crate::executor::InstructionExecutor;
use crate::flow::{FlowControl, FlowHandle, FlowId, FlowStatus};
use crate::runner::{BlockRunner, Progress};

struct FlowEntry {
    handle: FlowHandle,
    task: JoinHandle<()>,
}

/// Runs flow programs against shared sensor and actuator collaborators
///
/// Every started flow gets its own task and runtime state. Flows share only
/// the collaborators: they read the same snapshots and may write the same
/// actuators, in which case the last write wins.
pub struct FlowEngine {
    sensors: Arc<dyn SensorSource>,
    actuators: Arc<dyn ActuatorSink>,
    config: EngineConfig,
    flows: DashMap<FlowId, FlowEntry>,
}

impl FlowEngine {
    pub fn new(
        sensors: Arc<dyn SensorSource>,
        actuators: Arc<dyn ActuatorSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            sensors,
            actuators,
            config,
            flows: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate `ast` and start running it
    ///
    /// Must be called from within a tokio runtime. A program with an
    /// undefined init block or GOTO target is rejected and never started.
    pub fn start(&self, ast: impl Into<Arc<Ast>>) -> LoadResult<FlowHandle> {
        self.start_named("flow", ast)
    }

    /// Like [`start`](Self::start), with a name for logs
    #[instrument(skip(self, ast))]
    pub fn start_named(&self, name: &str, ast: impl Into<Arc<Ast>>) -> LoadResult<FlowHandle> {
        let ast = ast.into();
        ast.validate()?;

        let handle = FlowHandle::new(name);
        let id = handle.id();

        let task = FlowTask {
            id,
            ast: ast.clone(),
            control: handle.control().clone(),
            sensors: self.sensors.clone(),
            actuators: self.actuators.clone(),
            config: self.config.clone(),
        };

        info!(flow_id = %id, init_block = %ast.init_block_id, "Starting flow");

        let task = tokio::spawn(task.run());
        self.flows.insert(
            id,
            FlowEntry {
                handle: handle.clone(),
                task,
            },
        );

        Ok(handle)
    }

    /// Request cancellation; returns false if the flow had already ended
    #[instrument(skip(self, handle), fields(flow_id = %handle.id()))]
    pub fn cancel(&self, handle: &FlowHandle) -> bool {
        let cancelled = handle.cancel();
        if cancelled {
            info!("Flow cancelled");
        }
        cancelled
    }

    pub fn status(&self, handle: &FlowHandle) -> FlowStatus {
        handle.status()
    }

    /// Look up a flow started by this engine
    pub fn get(&self, id: FlowId) -> Option<FlowHandle> {
        self.flows.get(&id).map(|entry| entry.handle.clone())
    }

    /// Id and status of every tracked flow, ordered by id
    pub fn flows(&self) -> Vec<(FlowId, FlowStatus)> {
        let mut flows: Vec<_> = self
            .flows
            .iter()
            .map(|entry| (*entry.key(), entry.handle.status()))
            .collect();
        flows.sort_by_key(|(id, _)| *id);
        flows
    }

    /// Cancel every flow that has not ended; returns how many were cancelled
    pub fn shutdown(&self) -> usize {
        let handles: Vec<_> = self
            .flows
            .iter()
            .map(|entry| entry.handle.clone())
            .collect();

        let count = handles.iter().filter(|handle| handle.cancel()).count();
        info!(cancelled = count, "Engine shutdown");
        count
    }

    /// Stop tracking a flow that has ended
    ///
    /// Returns false if the flow is unknown or still active.
    pub fn forget(&self, handle: &FlowHandle) -> bool {
        let removed = self
            .flows
            .remove_if(&handle.id(), |_, entry| entry.handle.status().is_terminal());

        match removed {
            Some((id, entry)) => {
                entry.task.abort();
                debug!(flow_id = %id, "Forgot flow");
                true
            }
            None => false,
        }
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }
}

enum Outcome {
    Halted,
    Cancelled,
}

/// One running flow
struct FlowTask {
    id: FlowId,
    ast: Arc<Ast>,
    control: Arc<FlowControl>,
    sensors: Arc<dyn SensorSource>,
    actuators: Arc<dyn ActuatorSink>,
    config: EngineConfig,
}

impl FlowTask {
    async fn run(self) {
        match self.drive().await {
            Ok(Outcome::Halted) => {
                if self.control.transition(FlowStatus::Halted) {
                    info!(flow_id = %self.id, "Flow halted");
                }
            }
            Ok(Outcome::Cancelled) => {
                debug!(flow_id = %self.id, "Flow task stopped after cancel");
            }
            Err(err) => {
                error!(flow_id = %self.id, error = %err, "Flow failed");
                self.control.transition(FlowStatus::Failed(err));
            }
        }
    }

    async fn drive(&self) -> FlowResult<Outcome> {
        let executor =
            InstructionExecutor::new(self.actuators.as_ref(), self.config.actuator_errors);
        let mut runner = BlockRunner::new(&self.ast)?;
        // Subscribe before the first read so no update can slip between a
        // failed WAIT check and parking on the channel
        let mut updates = self.sensors.subscribe();
        let mut jumps_since_yield = 0u32;

        loop {
            if self.control.is_cancelled() {
                return Ok(Outcome::Cancelled);
            }

            let snapshot = self.sensors.snapshot();
            match runner.step(&executor, &snapshot)? {
                Progress::Advanced => {}
                Progress::Exhausted => return Ok(Outcome::Halted),
                Progress::Jumped => {
                    jumps_since_yield += 1;
                    if self.config.jump_yield_interval > 0
                        && jumps_since_yield >= self.config.jump_yield_interval
                    {
                        jumps_since_yield = 0;
                        tokio::task::yield_now().await;
                    }
                }
                Progress::Suspended => {
                    if let Some(condition) = runner.pending() {
                        self.control.transition(FlowStatus::Waiting(condition.clone()));
                    }
                    if !self.wait(&mut runner, &mut updates, &snapshot).await? {
                        return Ok(Outcome::Cancelled);
                    }
                    self.control.transition(FlowStatus::Running);
                }
            }
        }
    }

    /// Park until a newer snapshot satisfies the pending wait
    ///
    /// Returns false if the flow was cancelled meanwhile.
    async fn wait(
        &self,
        runner: &mut BlockRunner<'_>,
        updates: &mut broadcast::Receiver<Snapshot>,
        checked: &Snapshot,
    ) -> FlowResult<bool> {
        let mut seen = checked.version();
        debug!(flow_id = %self.id, block = %runner.block(), version = seen, "Waiting");

        loop {
            tokio::select! {
                biased;

                _ = self.control.cancelled() => return Ok(false),

                update = updates.recv() => {
                    let snapshot = match update {
                        Ok(snapshot) => snapshot,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(
                                flow_id = %self.id,
                                skipped,
                                "Sensor updates lagged, re-reading snapshot"
                            );
                            self.sensors.snapshot()
                        }
                        Err(RecvError::Closed) => {
                            warn!(flow_id = %self.id, "Sensor source closed while waiting");
                            self.control.cancelled().await;
                            return Ok(false);
                        }
                    };

                    if snapshot.version() <= seen {
                        trace!(version = snapshot.version(), seen, "Skipping stale snapshot");
                        continue;
                    }
                    seen = snapshot.version();

                    if runner.try_resume(&snapshot)? {
                        return Ok(true);
                    }
                }
            }
        }
    }
}
