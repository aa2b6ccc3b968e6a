//! Supervisor control loop.
//!
//! Drives every unit through Implement → Build/Test → QA →
//! Fix-or-Commit → Push. The driving loop claims ready units from the
//! resolver, runs up to `concurrency` unit state machines in parallel
//! worker tasks, and updates the task state store after every phase
//! transition. Work is committed only when every gate passes.

mod cancel;
mod config;
mod events;
mod summary;

pub use cancel::CancelFlag;
pub use config::RunConfig;
pub use events::{CollectingSink, EventSink, RunEvent, TracingSink};
pub use summary::{PushWarning, RunSummary, UnitFailure};

use std::error::Error;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;
use uuid::Uuid;

use crate::context::Collaborators;
use crate::errors::{GraphError, RunError};
use crate::gate;
use crate::graph::DependencyGraph;
use crate::ports::FeedbackContext;
use crate::store::{FailureNote, StatusSnapshot, TaskState, TaskStateStore};
use crate::unit::Unit;

/// Outcome of the commit phase for one verified unit.
enum CommitOutcome {
    /// Committed (and pushed, unless skipped); the unit is Succeeded.
    Done,
    /// The commit call failed; the failure feeds the retry decision.
    Retry(FailureNote),
    /// Cancellation arrived first; the unit was marked Failed.
    Abandoned,
}

/// Orchestrates one run over a validated unit list.
///
/// Cloneable so each worker task carries its own handle; all state is
/// shared behind `Arc`.
#[derive(Clone)]
pub struct Supervisor {
    graph: Arc<DependencyGraph>,
    store: Arc<Mutex<TaskStateStore>>,
    collab: Collaborators,
    config: RunConfig,
    events: Arc<dyn EventSink>,
    /// Spans Commit and Push so two units' commits never interleave on
    /// the shared working tree.
    commit_lock: Arc<tokio::sync::Mutex<()>>,
    cancel: Arc<CancelFlag>,
    push_warnings: Arc<Mutex<Vec<PushWarning>>>,
    run_id: String,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Builds the dependency graph and the state store for a run.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if the unit list contains an unknown
    /// dependency reference or a cycle; nothing is scheduled in that
    /// case.
    pub fn new(
        units: Vec<Unit>,
        collab: Collaborators,
        config: RunConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, GraphError> {
        let graph = Arc::new(DependencyGraph::build(units)?);
        let store = Arc::new(Mutex::new(TaskStateStore::new(&graph)));
        Ok(Self {
            graph,
            store,
            collab,
            config,
            events,
            commit_lock: Arc::new(tokio::sync::Mutex::new(())),
            cancel: Arc::new(CancelFlag::new()),
            push_warnings: Arc::new(Mutex::new(Vec::new())),
            run_id: Uuid::new_v4().to_string(),
        })
    }

    /// Handle for raising the run-level cancellation signal.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<CancelFlag> {
        Arc::clone(&self.cancel)
    }

    /// Read-only view of current unit statuses.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.store.lock().expect("store lock poisoned").snapshot()
    }

    /// Drives every unit to a terminal state and returns the summary.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] only for fatal conditions (an illegal state
    /// transition, a dead worker task). Unit failures and blocked
    /// dependents are not errors; they are reported in the summary.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let mut workers: JoinSet<Result<(), RunError>> = JoinSet::new();
        // One shared deadline for all in-flight work once cancellation
        // arrives, so the total wait never exceeds the grace period.
        let mut grace_deadline: Option<tokio::time::Instant> = None;
        loop {
            if !self.cancel.is_cancelled() {
                while workers.len() < self.config.concurrency {
                    let Some(unit) = self.claim_next()? else { break };
                    let supervisor = self.clone();
                    workers.spawn(async move { supervisor.drive(unit).await });
                }
            }
            if workers.is_empty() {
                break;
            }

            let joined = if self.cancel.is_cancelled() {
                let deadline = *grace_deadline.get_or_insert_with(|| {
                    tokio::time::Instant::now() + self.config.grace_period
                });
                match tokio::time::timeout_at(deadline, workers.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        // Grace expired: abandon in-flight calls and
                        // mark their units failed.
                        workers.abort_all();
                        while workers.join_next().await.is_some() {}
                        self.fail_in_flight()?;
                        break;
                    }
                }
            } else {
                tokio::select! {
                    joined = workers.join_next() => joined,
                    () = self.cancel.cancelled() => continue,
                }
            };

            match joined {
                Some(Ok(result)) => result?,
                Some(Err(join_error)) if join_error.is_cancelled() => {}
                Some(Err(join_error)) => return Err(RunError::Worker(join_error.to_string())),
                None => {}
            }
        }

        let push_warnings =
            self.push_warnings.lock().expect("push warnings lock poisoned").clone();
        Ok(RunSummary::from_snapshot(
            self.run_id.clone(),
            &self.snapshot(),
            self.cancel.is_cancelled(),
            push_warnings,
        ))
    }

    /// Claims the next ready unit, walking it to `InProgress` under the
    /// store lock so no two workers can take the same unit.
    fn claim_next(&self) -> Result<Option<Unit>, RunError> {
        let claimed = {
            let mut store = self.store.lock().expect("store lock poisoned");
            store.claim(&self.graph, self.collab.clock.as_ref())?
        };
        let Some(name) = claimed else { return Ok(None) };

        let at = self.collab.clock.now();
        for (from, to) in [
            (TaskState::Pending, TaskState::Ready),
            (TaskState::Ready, TaskState::InProgress),
        ] {
            self.events.emit(&RunEvent { unit: name.clone(), from, to, context: None, at });
        }
        let unit = self
            .graph
            .unit(&name)
            .cloned()
            .ok_or_else(|| RunError::Worker(format!("claimed unit `{name}` missing from graph")))?;
        Ok(Some(unit))
    }

    /// Per-unit state machine: bounded Implement/Verify/Fix cycles
    /// ending in Succeeded or Failed.
    async fn drive(self, unit: Unit) -> Result<(), RunError> {
        let mut feedback: Option<FeedbackContext> = None;
        loop {
            if self.cancel.is_cancelled() {
                return self.fail_unit(&unit.name, FailureNote::text("run cancelled"));
            }

            // Implement runs in InProgress on the first attempt and in
            // Fixing on every retry; a failure of the call itself is a
            // Verifying-phase failure and consumes an attempt.
            let implement_failure = match self
                .bounded("implement", self.collab.codegen.implement(&unit, feedback.as_ref()))
                .await
            {
                Ok(change_set) => {
                    tracing::debug!(
                        unit = %unit.name,
                        files = change_set.files.len(),
                        "implement finished"
                    );
                    None
                }
                Err(note) => Some(note),
            };

            let retrying = feedback.is_some();
            self.transition(&unit.name, TaskState::Verifying, None)?;
            if retrying {
                self.store.lock().expect("store lock poisoned").record_attempt(&unit.name);
            }

            let failure = match implement_failure {
                Some(note) => Some(note),
                None => self.verify(&unit).await,
            };

            let note = match failure {
                Some(note) => note,
                None => match self.commit_phase(&unit).await? {
                    CommitOutcome::Done | CommitOutcome::Abandoned => return Ok(()),
                    CommitOutcome::Retry(note) => note,
                },
            };

            if self.cancel.is_cancelled() {
                return self.fail_unit(
                    &unit.name,
                    FailureNote {
                        summary: format!("run cancelled after failure: {}", note.summary),
                        violations: note.violations,
                    },
                );
            }

            let attempts = self.attempts_of(&unit.name);
            if attempts < self.config.max_retries {
                feedback = Some(FeedbackContext {
                    attempt: attempts + 2,
                    errors: note.summary.clone(),
                    violations: note.violations.clone(),
                });
                self.transition(&unit.name, TaskState::Fixing, Some(note))?;
            } else {
                return self.fail_unit(&unit.name, note);
            }
        }
    }

    /// Build/test and QA gates. `None` means the unit passed both.
    async fn verify(&self, unit: &Unit) -> Option<FailureNote> {
        let report = match self
            .bounded("build/test", self.collab.builder.build_and_test(unit))
            .await
        {
            Ok(report) => report,
            Err(note) => return Some(note),
        };

        // A fresh verdict every attempt; build/test failure overrides a
        // vacuously passing empty rule set.
        let verdict = gate::evaluate(&unit.quality_rules, &report.metrics);
        if report.passed && verdict.passed {
            return None;
        }

        let mut parts = Vec::new();
        if !report.passed {
            parts.push(format!("build/test failed:\n{}", tail(&report.raw_output, 2000)));
        }
        if !verdict.passed {
            parts.push(verdict.summary());
        }
        Some(FailureNote { summary: parts.join("\n"), violations: verdict.violations })
    }

    /// Commit then push, serialized globally. Reachable only from a
    /// passing Verifying outcome.
    async fn commit_phase(&self, unit: &Unit) -> Result<CommitOutcome, RunError> {
        let _guard = self.commit_lock.lock().await;
        if self.cancel.is_cancelled() {
            self.fail_unit(&unit.name, FailureNote::text("run cancelled before commit"))?;
            return Ok(CommitOutcome::Abandoned);
        }

        let message = commit_message(unit, self.attempts_of(&unit.name) + 1);
        match self.collab.vcs.commit(&message).await {
            Ok(commit) => {
                if !self.config.skip_push {
                    if let Err(error) = self.collab.vcs.push(&commit).await {
                        // Reported, but the unit's local verification
                        // already succeeded.
                        tracing::warn!(unit = %unit.name, error = %error, "push failed");
                        self.push_warnings
                            .lock()
                            .expect("push warnings lock poisoned")
                            .push(PushWarning { unit: unit.name.clone(), error: error.to_string() });
                    }
                }
                self.transition(&unit.name, TaskState::Succeeded, None)?;
                Ok(CommitOutcome::Done)
            }
            Err(error) => {
                Ok(CommitOutcome::Retry(FailureNote::text(format!("commit failed: {error}"))))
            }
        }
    }

    /// Applies the per-call timeout; a timeout is distinguishable from
    /// a functional failure in the resulting note.
    async fn bounded<T>(
        &self,
        phase: &str,
        call: impl Future<Output = Result<T, Box<dyn Error + Send + Sync>>> + Send,
    ) -> Result<T, FailureNote> {
        match tokio::time::timeout(self.config.per_call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(FailureNote::text(format!("{phase} call failed: {error}"))),
            Err(_) => Err(FailureNote::text(format!(
                "{phase} call timed out after {:?}",
                self.config.per_call_timeout
            ))),
        }
    }

    fn attempts_of(&self, name: &str) -> u32 {
        let store = self.store.lock().expect("store lock poisoned");
        store.record(name).map_or(0, |r| r.attempts)
    }

    /// Transitions one unit and emits the matching event.
    fn transition(
        &self,
        name: &str,
        to: TaskState,
        note: Option<FailureNote>,
    ) -> Result<(), RunError> {
        let context = note.as_ref().map(|n| n.summary.clone());
        let from = {
            let mut store = self.store.lock().expect("store lock poisoned");
            let from = store.record(name).map_or(TaskState::Pending, |r| r.state);
            store.transition(name, to, note, self.collab.clock.as_ref())?;
            from
        };
        self.events.emit(&RunEvent {
            unit: name.to_string(),
            from,
            to,
            context,
            at: self.collab.clock.now(),
        });
        Ok(())
    }

    /// Fails one unit, blocks its transitive dependents, and emits
    /// events for every record that changed.
    fn fail_unit(&self, name: &str, note: FailureNote) -> Result<(), RunError> {
        let context = note.summary.clone();
        let (before, after) = {
            let mut store = self.store.lock().expect("store lock poisoned");
            let before = store.snapshot();
            store.fail_and_block_dependents(
                &self.graph,
                name,
                note,
                self.collab.clock.as_ref(),
            )?;
            (before, store.snapshot())
        };

        let at = self.collab.clock.now();
        let from = before.get(name).map_or(TaskState::Pending, |r| r.state);
        self.events.emit(&RunEvent {
            unit: name.to_string(),
            from,
            to: TaskState::Failed,
            context: Some(context),
            at,
        });
        for (unit, record) in &after {
            let was = before.get(unit).map_or(TaskState::Pending, |r| r.state);
            if unit != name && record.state == TaskState::Blocked && was != TaskState::Blocked {
                self.events.emit(&RunEvent {
                    unit: unit.clone(),
                    from: was,
                    to: TaskState::Blocked,
                    context: record.last_failure().map(|f| f.note.summary.clone()),
                    at,
                });
            }
        }
        Ok(())
    }

    /// Marks everything still mid-phase as failed with a cancellation
    /// reason. Used after the grace period expires.
    fn fail_in_flight(&self) -> Result<(), RunError> {
        let in_flight: Vec<String> = self
            .snapshot()
            .iter()
            .filter(|(_, record)| {
                matches!(
                    record.state,
                    TaskState::InProgress | TaskState::Verifying | TaskState::Fixing
                )
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in in_flight {
            self.fail_unit(&name, FailureNote::text("run cancelled; grace period expired"))?;
        }
        Ok(())
    }
}

/// Structured commit message: unit, attempt count, satisfied gates.
fn commit_message(unit: &Unit, implement_calls: u32) -> String {
    let mut message = format!(
        "feat: complete {}\n\nUnit: {} ({})\nAttempts: {}\n",
        unit.name,
        unit.name,
        unit.kind.label(),
        implement_calls
    );
    if unit.quality_rules.is_empty() {
        message.push_str("Gates: build and tests\n");
    } else {
        message.push_str("Satisfied rules:\n");
        for rule in &unit.quality_rules {
            message.push_str(&format!("- {rule}\n"));
        }
    }
    message
}

/// Last `max` bytes of `s`, snapped forward to a char boundary.
fn tail(s: &str, max: usize) -> &str {
    let mut start = s.len().saturating_sub(max);
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{CompareOp, QualityRule, ServiceKind};

    #[test]
    fn commit_message_lists_rules_and_attempts() {
        let unit = Unit {
            name: "tts".to_string(),
            kind: ServiceKind::Audio,
            description: String::new(),
            dependencies: vec![],
            quality_rules: vec![QualityRule {
                metric: "mcd".to_string(),
                op: CompareOp::Lt,
                threshold: 6.0,
            }],
            build_command: None,
        };
        let message = commit_message(&unit, 3);
        assert!(message.starts_with("feat: complete tts\n"));
        assert!(message.contains("Attempts: 3"));
        assert!(message.contains("- mcd < 6"));
    }

    #[test]
    fn commit_message_without_rules_names_the_build_gate() {
        let unit = Unit {
            name: "api".to_string(),
            kind: ServiceKind::Backend,
            description: String::new(),
            dependencies: vec![],
            quality_rules: vec![],
            build_command: None,
        };
        assert!(commit_message(&unit, 1).contains("Gates: build and tests"));
    }

    #[test]
    fn tail_respects_char_boundaries() {
        let s = "héllo wörld";
        let t = tail(s, 4);
        assert!(t.len() <= 5);
        assert!(s.ends_with(t));
        assert_eq!(tail("short", 100), "short");
    }
}
