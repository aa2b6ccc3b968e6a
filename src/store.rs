//! Task state store — the single source of truth for unit lifecycles.
//!
//! The store owns every unit's [`TaskRecord`]; the control loop is its
//! only mutator. All reads by the resolver and by observers go through
//! [`TaskStateStore::snapshot`], which exposes no mutation access.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::InvalidTransitionError;
use crate::gate::Violation;
use crate::graph::DependencyGraph;
use crate::ports::Clock;

/// Lifecycle state of one unit within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Not yet eligible; dependencies outstanding.
    Pending,
    /// Dependencies satisfied, waiting to be selected.
    Ready,
    /// Implement phase running.
    InProgress,
    /// Build/test/QA phase running.
    Verifying,
    /// A failed attempt is being reworked with feedback.
    Fixing,
    /// Terminal: all gates passed and work was committed.
    Succeeded,
    /// Terminal: retry budget exhausted or run cancelled mid-flight.
    Failed,
    /// Terminal: a (transitive) dependency failed.
    Blocked,
}

impl TaskState {
    /// `true` for states no run ever leaves.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Blocked)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::InProgress => "in-progress",
            Self::Verifying => "verifying",
            Self::Fixing => "fixing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
        };
        f.write_str(label)
    }
}

/// Failure context supplied when a unit enters Fixing or Failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureNote {
    /// Free-text summary (error logs, timeout notice, verdict text).
    pub summary: String,
    /// Structured quality-rule violations, when the QA gate failed.
    pub violations: Vec<Violation>,
}

impl FailureNote {
    /// A note with no structured violations.
    #[must_use]
    pub fn text(summary: impl Into<String>) -> Self {
        Self { summary: summary.into(), violations: Vec::new() }
    }
}

/// One recorded failure, tagged with the implement-call number it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// 1-based implement-call number this failure concluded.
    pub attempt: u32,
    /// The failure context.
    pub note: FailureNote,
}

/// Full lifecycle record for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Current state.
    pub state: TaskState,
    /// Number of completed Fix cycles; implement calls = attempts + 1.
    pub attempts: u32,
    /// Failure history, oldest first.
    pub failures: Vec<FailureRecord>,
    /// Entry timestamp for each state the unit has passed through.
    pub entered: Vec<(TaskState, DateTime<Utc>)>,
}

impl TaskRecord {
    /// The most recent failure, if any.
    #[must_use]
    pub fn last_failure(&self) -> Option<&FailureRecord> {
        self.failures.last()
    }
}

/// Read-only view of all unit records.
pub type StatusSnapshot = BTreeMap<String, TaskRecord>;

/// In-memory store of every unit's lifecycle status.
#[derive(Debug)]
pub struct TaskStateStore {
    records: BTreeMap<String, TaskRecord>,
}

impl TaskStateStore {
    /// Creates one Pending record per unit in the graph.
    #[must_use]
    pub fn new(graph: &DependencyGraph) -> Self {
        let records = graph
            .units()
            .iter()
            .map(|unit| {
                (
                    unit.name.clone(),
                    TaskRecord {
                        state: TaskState::Pending,
                        attempts: 0,
                        failures: Vec::new(),
                        entered: Vec::new(),
                    },
                )
            })
            .collect();
        Self { records }
    }

    /// Returns a read-only clone of all records.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.records.clone()
    }

    /// Moves a unit to `to`, appending `note` to its failure history
    /// when entering Fixing or Failed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError`] for any move the state
    /// machine does not permit; this is a scheduler bug, never an
    /// external failure, and callers must treat it as fatal.
    pub fn transition(
        &mut self,
        name: &str,
        to: TaskState,
        note: Option<FailureNote>,
        clock: &dyn Clock,
    ) -> Result<(), InvalidTransitionError> {
        let record = self.records.get_mut(name).ok_or_else(|| InvalidTransitionError {
            unit: name.to_string(),
            from: TaskState::Pending,
            to,
        })?;

        let from = record.state;
        if !permitted(from, to) {
            return Err(InvalidTransitionError { unit: name.to_string(), from, to });
        }

        record.state = to;
        record.entered.push((to, clock.now()));
        if matches!(to, TaskState::Fixing | TaskState::Failed) {
            if let Some(note) = note {
                let attempt = record.attempts + 1;
                record.failures.push(FailureRecord { attempt, note });
            }
        }
        Ok(())
    }

    /// Increments a unit's fix-cycle counter. Called when the unit
    /// re-enters Verifying from Fixing.
    pub fn record_attempt(&mut self, name: &str) {
        if let Some(record) = self.records.get_mut(name) {
            record.attempts += 1;
        }
    }

    /// Atomically claims the next ready unit: selects it via the
    /// graph's readiness order and walks it Pending → Ready →
    /// `InProgress` before returning, so concurrent callers can never
    /// claim the same unit.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError`] if the claimed unit's record
    /// rejects the walk, which indicates a scheduler bug.
    pub fn claim(
        &mut self,
        graph: &DependencyGraph,
        clock: &dyn Clock,
    ) -> Result<Option<String>, InvalidTransitionError> {
        let Some(unit) = graph.next_ready(&self.snapshot()) else {
            return Ok(None);
        };
        let name = unit.name.clone();
        self.transition(&name, TaskState::Ready, None, clock)?;
        self.transition(&name, TaskState::InProgress, None, clock)?;
        Ok(Some(name))
    }

    /// Marks a unit Failed and eagerly blocks every transitive
    /// dependent that has not already reached a terminal state, in a
    /// single pass, so the resolver never offers a doomed unit.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError`] if the unit itself cannot
    /// legally enter Failed.
    pub fn fail_and_block_dependents(
        &mut self,
        graph: &DependencyGraph,
        name: &str,
        note: FailureNote,
        clock: &dyn Clock,
    ) -> Result<(), InvalidTransitionError> {
        self.transition(name, TaskState::Failed, Some(note), clock)?;
        for dependent in graph.dependents_of(name) {
            let blockable = self
                .records
                .get(&dependent)
                .is_some_and(|r| matches!(r.state, TaskState::Pending | TaskState::Ready));
            if blockable {
                self.transition(
                    &dependent,
                    TaskState::Blocked,
                    Some(FailureNote::text(format!("blocked by failure of `{name}`"))),
                    clock,
                )?;
            }
        }
        Ok(())
    }

    /// `true` once every unit has reached a terminal state.
    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.records.values().all(|r| r.state.is_terminal())
    }

    /// Direct access to one record.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&TaskRecord> {
        self.records.get(name)
    }

    /// Test helper: jam a unit into a state without legality checks.
    #[cfg(test)]
    pub(crate) fn force_state(&mut self, name: &str, state: TaskState, clock: &dyn Clock) {
        if let Some(record) = self.records.get_mut(name) {
            record.state = state;
            record.entered.push((state, clock.now()));
        }
    }
}

/// The transition table. Blocked is enterable from Pending or Ready
/// only; in-flight states may drop straight to Failed on cancellation.
fn permitted(from: TaskState, to: TaskState) -> bool {
    use TaskState::{Blocked, Failed, Fixing, InProgress, Pending, Ready, Succeeded, Verifying};
    matches!(
        (from, to),
        (Pending, Ready | Blocked)
            | (Ready, InProgress | Blocked)
            | (InProgress, Verifying | Failed)
            | (Verifying, Succeeded | Fixing | Failed)
            | (Fixing, Verifying | Failed)
    )
}
