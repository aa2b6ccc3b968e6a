//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the supervisor core and an
//! external collaborator (time, code generation, build/test execution,
//! version control). Implementations live in `src/adapters/`; the core
//! depends only on these traits, never on a concrete variant.

pub mod builder;
pub mod clock;
pub mod codegen;
pub mod vcs;

pub use builder::{BuildFuture, BuildReport, BuildRunner};
pub use clock::Clock;
pub use codegen::{ChangeSet, CodeGenerator, CodegenFuture, FeedbackContext};
pub use vcs::{CommitFuture, CommitRef, PushFuture, VersionControl};
