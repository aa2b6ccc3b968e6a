//! Final run summary.

use serde::{Deserialize, Serialize};

use crate::gate::Violation;
use crate::store::{StatusSnapshot, TaskState};

/// Last failure context for one Failed unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// The failed unit.
    pub unit: String,
    /// Free-text error summary from the final attempt.
    pub summary: String,
    /// Quality rules the final attempt violated.
    pub violations: Vec<Violation>,
}

/// A push that failed after a successful local commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushWarning {
    /// Unit whose commit could not be pushed.
    pub unit: String,
    /// The push error.
    pub error: String,
}

/// Counts and failure details reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identifier of this run.
    pub run_id: String,
    /// Units that passed every gate and were committed.
    pub succeeded: usize,
    /// Units that exhausted their retry budget or were cancelled
    /// mid-flight.
    pub failed: usize,
    /// Units blocked by a failed dependency.
    pub blocked: usize,
    /// Units never started because the run was cancelled first.
    pub skipped: usize,
    /// Whether the run was cancelled.
    pub cancelled: bool,
    /// Per-unit failure details, in unit-name order.
    pub failures: Vec<UnitFailure>,
    /// Pushes that failed after a successful commit.
    pub push_warnings: Vec<PushWarning>,
}

impl RunSummary {
    /// Builds the summary from a final status snapshot.
    #[must_use]
    pub fn from_snapshot(
        run_id: String,
        snapshot: &StatusSnapshot,
        cancelled: bool,
        push_warnings: Vec<PushWarning>,
    ) -> Self {
        let mut summary = Self {
            run_id,
            succeeded: 0,
            failed: 0,
            blocked: 0,
            skipped: 0,
            cancelled,
            failures: Vec::new(),
            push_warnings,
        };
        for (name, record) in snapshot {
            match record.state {
                TaskState::Succeeded => summary.succeeded += 1,
                TaskState::Failed => {
                    summary.failed += 1;
                    let (text, violations) = record
                        .last_failure()
                        .map(|f| (f.note.summary.clone(), f.note.violations.clone()))
                        .unwrap_or_default();
                    summary.failures.push(UnitFailure {
                        unit: name.clone(),
                        summary: text,
                        violations,
                    });
                }
                TaskState::Blocked => summary.blocked += 1,
                _ => summary.skipped += 1,
            }
        }
        summary
    }

    /// Human-readable rendering for the CLI.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "Run {}: {} succeeded, {} failed, {} blocked",
            self.run_id, self.succeeded, self.failed, self.blocked
        );
        if self.skipped > 0 {
            out.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.cancelled {
            out.push_str(" (cancelled)");
        }
        out.push('\n');
        for failure in &self.failures {
            out.push_str(&format!("  {} failed: {}\n", failure.unit, failure.summary));
            for violation in &failure.violations {
                out.push_str(&format!("    - {violation}\n"));
            }
        }
        for warning in &self.push_warnings {
            out.push_str(&format!("  warning: push failed for {}: {}\n", warning.unit, warning.error));
        }
        out
    }
}
