//! Scripted code generator.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::ports::{ChangeSet, CodeGenerator, CodegenFuture, FeedbackContext};
use crate::unit::Unit;

/// One canned outcome for an `implement` call.
#[derive(Debug, Clone)]
pub enum CodegenOutcome {
    /// Return the given change set.
    Succeed(ChangeSet),
    /// Fail the call with the given message (a collaborator error).
    Fail(String),
    /// Sleep for the duration, then succeed; used to exercise per-call
    /// timeouts.
    Hang(Duration),
}

/// A recorded `implement` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedImplement {
    /// Unit the call was for.
    pub unit: String,
    /// Whether feedback from a previous attempt was supplied.
    pub had_feedback: bool,
}

/// Scripted code generator serving per-unit outcome queues.
///
/// Units without a script succeed with a stub change set. Every call
/// is recorded for assertions.
#[derive(Debug, Default)]
pub struct ScriptedCodeGenerator {
    scripts: Mutex<HashMap<String, VecDeque<CodegenOutcome>>>,
    calls: Mutex<Vec<RecordedImplement>>,
}

impl ScriptedCodeGenerator {
    /// Creates a generator whose every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues outcomes for one unit, served in order. Once the queue
    /// drains, further calls fall back to the stub success.
    pub fn script(&self, unit: &str, outcomes: impl IntoIterator<Item = CodegenOutcome>) {
        let mut scripts = self.scripts.lock().expect("scripts lock poisoned");
        scripts.entry(unit.to_string()).or_default().extend(outcomes);
    }

    /// Number of `implement` calls issued for `unit`.
    #[must_use]
    pub fn calls_for(&self, unit: &str) -> usize {
        let calls = self.calls.lock().expect("calls lock poisoned");
        calls.iter().filter(|c| c.unit == unit).count()
    }

    /// All recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedImplement> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    fn next_outcome(&self, unit: &str) -> CodegenOutcome {
        let mut scripts = self.scripts.lock().expect("scripts lock poisoned");
        scripts
            .get_mut(unit)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                CodegenOutcome::Succeed(ChangeSet {
                    summary: format!("generated {unit}"),
                    files: vec![format!("{unit}/main.py")],
                })
            })
    }
}

impl CodeGenerator for ScriptedCodeGenerator {
    fn implement(&self, unit: &Unit, feedback: Option<&FeedbackContext>) -> CodegenFuture<'_> {
        {
            let mut calls = self.calls.lock().expect("calls lock poisoned");
            calls.push(RecordedImplement {
                unit: unit.name.clone(),
                had_feedback: feedback.is_some(),
            });
        }
        let outcome = self.next_outcome(&unit.name);
        Box::pin(async move {
            match outcome {
                CodegenOutcome::Succeed(change_set) => Ok(change_set),
                CodegenOutcome::Fail(message) => Err(message.into()),
                CodegenOutcome::Hang(duration) => {
                    tokio::time::sleep(duration).await;
                    Ok(ChangeSet { summary: "late".to_string(), files: vec![] })
                }
            }
        })
    }
}
