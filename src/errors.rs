//! Error taxonomy for the supervisor core.

use thiserror::Error;

use crate::store::TaskState;

/// Fatal graph construction failure; aborts a run before any unit
/// executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A declared dependency does not match any unit name.
    #[error("unit `{unit}` depends on unknown unit `{dependency}`")]
    UnknownDependency {
        /// The unit declaring the bad reference.
        unit: String,
        /// The name that matched nothing.
        dependency: String,
    },
    /// The dependency relation is not a DAG.
    #[error("dependency cycle detected involving unit `{unit}`")]
    Cycle {
        /// A unit on the offending cycle.
        unit: String,
    },
}

/// Internal consistency violation in the task state machine.
///
/// Always fatal to the run: it indicates a scheduler bug, never an
/// external failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal transition for unit `{unit}`: {from} -> {to}")]
pub struct InvalidTransitionError {
    /// The unit whose record was being moved.
    pub unit: String,
    /// State the unit was in.
    pub from: TaskState,
    /// State the transition attempted to enter.
    pub to: TaskState,
}

/// Fatal run-level failure surfaced to the caller.
#[derive(Debug, Error)]
pub enum RunError {
    /// Graph construction failed; nothing was scheduled.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// The state machine rejected a transition; the run is aborted.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransitionError),
    /// A worker task died without reporting a result.
    #[error("worker task failed: {0}")]
    Worker(String),
}
