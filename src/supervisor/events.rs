//! Observable per-transition events.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::TaskState;

/// One state transition observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Unit the transition belongs to.
    pub unit: String,
    /// State the unit left.
    pub from: TaskState,
    /// State the unit entered.
    pub to: TaskState,
    /// Failure context, when the transition carried one.
    pub context: Option<String>,
    /// When the transition happened.
    pub at: DateTime<Utc>,
}

/// Receives run events for progress display.
///
/// Sinks must tolerate concurrent emission when the run is configured
/// with `concurrency > 1`.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: &RunEvent);
}

/// Sink that logs each transition through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RunEvent) {
        match &event.context {
            Some(context) => tracing::warn!(
                unit = %event.unit,
                from = %event.from,
                to = %event.to,
                %context,
                "task transition"
            ),
            None => tracing::info!(
                unit = %event.unit,
                from = %event.from,
                to = %event.to,
                "task transition"
            ),
        }
    }
}

/// Sink that buffers events in memory, for tests and summaries.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events emitted so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().expect("events lock poisoned").clone()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &RunEvent) {
        self.events.lock().expect("events lock poisoned").push(event.clone());
    }
}
