//! Code-generation port: the collaborator that writes code for a unit.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::gate::Violation;
use crate::unit::Unit;

/// Boxed future type alias used by [`CodeGenerator`] to keep the trait
/// dyn-compatible.
pub type CodegenFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ChangeSet, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// The files a generation call produced or touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Generator's own summary of what was done.
    pub summary: String,
    /// Workspace-relative paths that were written.
    pub files: Vec<String>,
}

/// Failure context from the previous attempt, handed to the generator
/// so a retry is informed rather than blind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackContext {
    /// 1-based implement-call number about to run.
    pub attempt: u32,
    /// Error logs and summaries from the failed attempt.
    pub errors: String,
    /// Quality rules the failed attempt violated.
    pub violations: Vec<Violation>,
}

impl FeedbackContext {
    /// Renders the context as prompt text.
    #[must_use]
    pub fn to_prompt(&self) -> String {
        let mut text = format!(
            "Previous attempt failed. This is attempt {}.\nErrors:\n{}",
            self.attempt, self.errors
        );
        if !self.violations.is_empty() {
            text.push_str("\nViolated quality rules:\n");
            for violation in &self.violations {
                text.push_str(&format!("- {violation}\n"));
            }
        }
        text
    }
}

/// Generates (or repairs) the code for one unit.
///
/// Side effect: files are written to the project workspace. A failure
/// of the call itself (provider down, timeout) consumes a retry
/// attempt just like a functional failure.
pub trait CodeGenerator: Send + Sync {
    /// Produces code for the unit, incorporating feedback when this is
    /// a retry.
    fn implement(&self, unit: &Unit, feedback: Option<&FeedbackContext>) -> CodegenFuture<'_>;
}
