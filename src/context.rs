//! Collaborator bundle handed to the supervisor.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::live::{AnthropicCodeGenerator, GitCliVcs, LiveClock, ShellBuildRunner};
use crate::adapters::mock::{FixedClock, RecordingVcs, ScriptedBuildRunner, ScriptedCodeGenerator};
use crate::ports::{BuildRunner, Clock, CodeGenerator, VersionControl};

/// Bundles all collaborator trait objects behind `Arc` so concurrent
/// unit workers can share them.
///
/// The supervisor depends only on this bundle, never on a concrete
/// adapter, so a run can be driven by live services or by scripted
/// mocks interchangeably.
#[derive(Clone)]
pub struct Collaborators {
    /// Clock stamping state transitions.
    pub clock: Arc<dyn Clock>,
    /// Code-generation collaborator.
    pub codegen: Arc<dyn CodeGenerator>,
    /// Build/test collaborator.
    pub builder: Arc<dyn BuildRunner>,
    /// Version-control collaborator.
    pub vcs: Arc<dyn VersionControl>,
}

impl Collaborators {
    /// Live collaborators: Anthropic code generation, shell builds,
    /// git CLI, system clock.
    #[must_use]
    pub fn live(project_root: &Path, branch: &str, model: &str) -> Self {
        Self {
            clock: Arc::new(LiveClock),
            codegen: Arc::new(AnthropicCodeGenerator::new(project_root.to_path_buf(), model)),
            builder: Arc::new(ShellBuildRunner::new(project_root.to_path_buf())),
            vcs: Arc::new(GitCliVcs::new(project_root.to_path_buf(), branch)),
        }
    }

    /// Mock collaborators with all-pass defaults: every implement call
    /// succeeds, every build passes, commits are recorded in memory.
    #[must_use]
    pub fn mock() -> Self {
        Self {
            clock: Arc::new(FixedClock::default()),
            codegen: Arc::new(ScriptedCodeGenerator::new()),
            builder: Arc::new(ScriptedBuildRunner::new()),
            vcs: Arc::new(RecordingVcs::new()),
        }
    }
}
