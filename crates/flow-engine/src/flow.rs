//! Flow identity, status and handles

use std::fmt;
use std::sync::Arc;

use flow_ast::Condition;
use tokio::sync::{watch, Notify};
use ulid::Ulid;

use crate::error::FlowError;

/// Unique identifier of a started flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId(Ulid);

impl FlowId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a flow
///
/// `Halted`, `Cancelled` and `Failed` are terminal: once reached, the status
/// never changes again.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStatus {
    /// Stepping instructions
    Running,
    /// Suspended until the condition holds on a newer snapshot
    Waiting(Condition),
    /// Ran out of instructions
    Halted,
    /// Stopped on request
    Cancelled,
    /// Stopped by an unrecoverable error
    Failed(FlowError),
}

impl FlowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowStatus::Halted | FlowStatus::Cancelled | FlowStatus::Failed(_)
        )
    }

    /// Short lowercase name of the state
    pub fn name(&self) -> &'static str {
        match self {
            FlowStatus::Running => "running",
            FlowStatus::Waiting(_) => "waiting",
            FlowStatus::Halted => "halted",
            FlowStatus::Cancelled => "cancelled",
            FlowStatus::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowStatus::Failed(err) => write!(f, "failed: {}", err),
            other => f.write_str(other.name()),
        }
    }
}

/// State shared between a flow task and its handles
#[derive(Debug)]
pub(crate) struct FlowControl {
    status: watch::Sender<FlowStatus>,
    cancel: Notify,
}

impl FlowControl {
    pub(crate) fn new() -> Self {
        let (status, _) = watch::channel(FlowStatus::Running);
        Self {
            status,
            cancel: Notify::new(),
        }
    }

    /// Move to `next` unless the current status is terminal
    ///
    /// Returns whether the status changed.
    pub(crate) fn transition(&self, next: FlowStatus) -> bool {
        self.status.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                return false;
            }
            *current = next;
            true
        })
    }

    /// Mark the flow cancelled and wake its task
    pub(crate) fn request_cancel(&self) -> bool {
        let changed = self.transition(FlowStatus::Cancelled);
        if changed {
            // Stores a permit if the task is not parked yet
            self.cancel.notify_one();
        }
        changed
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(*self.status.borrow(), FlowStatus::Cancelled)
    }

    /// Resolves once cancellation has been requested
    pub(crate) async fn cancelled(&self) {
        self.cancel.notified().await
    }

    pub(crate) fn status(&self) -> FlowStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<FlowStatus> {
        self.status.subscribe()
    }
}

/// Caller-side handle to a started flow
///
/// Cheap to clone; all clones observe the same flow.
#[derive(Debug, Clone)]
pub struct FlowHandle {
    id: FlowId,
    name: Arc<str>,
    control: Arc<FlowControl>,
}

impl FlowHandle {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            id: FlowId::new(),
            name: Arc::from(name),
            control: Arc::new(FlowControl::new()),
        }
    }

    pub(crate) fn control(&self) -> &Arc<FlowControl> {
        &self.control
    }

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status
    pub fn status(&self) -> FlowStatus {
        self.control.status()
    }

    /// Request cancellation
    ///
    /// The status becomes `Cancelled` before this returns. Returns false if
    /// the flow had already reached a terminal state.
    pub fn cancel(&self) -> bool {
        self.control.request_cancel()
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<FlowStatus> {
        self.control.subscribe()
    }

    /// Wait until the status satisfies `predicate`, returning that status
    pub async fn wait_for(&self, predicate: impl FnMut(&FlowStatus) -> bool) -> FlowStatus {
        let mut rx = self.control.subscribe();
        let result = rx.wait_for(predicate).await.map(|status| status.clone());
        // The sender lives in `self.control`, so the channel cannot close
        result.unwrap_or_else(|_| self.status())
    }

    /// Wait until the flow reaches a terminal state
    pub async fn wait(&self) -> FlowStatus {
        self.wait_for(FlowStatus::is_terminal).await
    }
}
