//! Mock adapters: scripted collaborators for tests and dry runs.
//!
//! Each adapter serves a per-unit queue of canned outcomes and records
//! every call it receives, so scheduler behavior can be asserted
//! without network, container, or git access. The `run --backend mock`
//! path uses the same adapters with their all-pass defaults.

pub mod builder;
pub mod clock;
pub mod codegen;
pub mod vcs;

pub use builder::{BuildOutcome, ScriptedBuildRunner};
pub use clock::FixedClock;
pub use codegen::{CodegenOutcome, ScriptedCodeGenerator};
pub use vcs::RecordingVcs;
