//! Quality gate evaluation.
//!
//! Pure functions over quality rules and metric observations. A fresh
//! [`Verdict`] is produced on every QA phase so replayed attempts can
//! never reuse a stale one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::spec::QualityRule;

/// A single violated rule, with the observed value if one existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// The rule that was not satisfied.
    pub rule: QualityRule,
    /// The observed value, or `None` when the metric was missing from
    /// the observations entirely.
    pub observed: Option<f64>,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.observed {
            Some(value) => {
                write!(f, "metric {} failed: {} {} {}", self.rule.metric, value, self.rule.op, self.rule.threshold)
            }
            None => write!(f, "missing metric: {}", self.rule.metric),
        }
    }
}

/// The pass/fail outcome of one quality-gate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// `true` iff there were zero violations.
    pub passed: bool,
    /// Violated rules in rule declaration order; empty iff `passed`.
    pub violations: Vec<Violation>,
}

impl Verdict {
    /// One-line textual summary of the violations, for failure context.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.passed {
            "quality gate passed".to_string()
        } else {
            self.violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
        }
    }
}

/// Evaluates quality rules against observed metrics.
///
/// A rule whose metric is absent from the observations records a
/// missing-metric violation; missing evidence is never a pass. An
/// empty rule set passes vacuously — a unit with no declared rules is
/// gated only by build/test success.
#[must_use]
pub fn evaluate(rules: &[QualityRule], observations: &BTreeMap<String, f64>) -> Verdict {
    let violations: Vec<Violation> = rules
        .iter()
        .filter_map(|rule| match observations.get(&rule.metric) {
            None => Some(Violation { rule: rule.clone(), observed: None }),
            Some(&value) if !rule.op.holds(value, rule.threshold) => {
                Some(Violation { rule: rule.clone(), observed: Some(value) })
            }
            Some(_) => None,
        })
        .collect();

    Verdict { passed: violations.is_empty(), violations }
}

/// Extracts `NAME: VALUE` metric lines from build/test output.
///
/// Lines whose value half does not parse as a float are skipped, never
/// an error. Later occurrences of a name overwrite earlier ones.
#[must_use]
pub fn parse_metrics(raw_output: &str) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    for line in raw_output.lines() {
        if let Some((name, value)) = line.split_once(':') {
            if let Ok(value) = value.trim().parse::<f64>() {
                metrics.insert(name.trim().to_string(), value);
            }
        }
    }
    metrics
}
