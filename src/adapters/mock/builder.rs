//! Scripted build/test runner.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::ports::{BuildFuture, BuildReport, BuildRunner};
use crate::unit::Unit;

/// One canned outcome for a `build_and_test` call.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// Return the given report.
    Report(BuildReport),
    /// Fail the call itself (engine unavailable).
    Fail(String),
    /// Sleep for the duration, then pass; used to exercise per-call
    /// timeouts.
    Hang(Duration),
}

impl BuildOutcome {
    /// A passing report with the given metrics.
    #[must_use]
    pub fn passing(metrics: &[(&str, f64)]) -> Self {
        Self::Report(BuildReport {
            passed: true,
            raw_output: "build ok\ntests ok".to_string(),
            metrics: to_map(metrics),
        })
    }

    /// A report whose build/test flag is false.
    #[must_use]
    pub fn build_failed(output: &str) -> Self {
        Self::Report(BuildReport {
            passed: false,
            raw_output: output.to_string(),
            metrics: BTreeMap::new(),
        })
    }

    /// A passing build whose metrics will fail a quality gate.
    #[must_use]
    pub fn passing_with_output(output: &str, metrics: &[(&str, f64)]) -> Self {
        Self::Report(BuildReport {
            passed: true,
            raw_output: output.to_string(),
            metrics: to_map(metrics),
        })
    }
}

fn to_map(metrics: &[(&str, f64)]) -> BTreeMap<String, f64> {
    metrics.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

/// Scripted build runner serving per-unit outcome queues.
///
/// Units without a script pass with no metrics. Calls are counted per
/// unit.
#[derive(Debug, Default)]
pub struct ScriptedBuildRunner {
    scripts: Mutex<HashMap<String, VecDeque<BuildOutcome>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBuildRunner {
    /// Creates a runner whose every call passes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues outcomes for one unit, served in order.
    pub fn script(&self, unit: &str, outcomes: impl IntoIterator<Item = BuildOutcome>) {
        let mut scripts = self.scripts.lock().expect("scripts lock poisoned");
        scripts.entry(unit.to_string()).or_default().extend(outcomes);
    }

    /// Number of `build_and_test` calls issued for `unit`.
    #[must_use]
    pub fn calls_for(&self, unit: &str) -> usize {
        let calls = self.calls.lock().expect("calls lock poisoned");
        calls.iter().filter(|c| c.as_str() == unit).count()
    }

    fn next_outcome(&self, unit: &str) -> BuildOutcome {
        let mut scripts = self.scripts.lock().expect("scripts lock poisoned");
        scripts
            .get_mut(unit)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| BuildOutcome::passing(&[]))
    }
}

impl BuildRunner for ScriptedBuildRunner {
    fn build_and_test(&self, unit: &Unit) -> BuildFuture<'_> {
        self.calls.lock().expect("calls lock poisoned").push(unit.name.clone());
        let outcome = self.next_outcome(&unit.name);
        Box::pin(async move {
            match outcome {
                BuildOutcome::Report(report) => Ok(report),
                BuildOutcome::Fail(message) => Err(message.into()),
                BuildOutcome::Hang(duration) => {
                    tokio::time::sleep(duration).await;
                    Ok(BuildReport {
                        passed: true,
                        raw_output: "late".to_string(),
                        metrics: BTreeMap::new(),
                    })
                }
            }
        })
    }
}
