//! Project specification format.
//!
//! Rust types mirroring the YAML project spec schema, plus the loader.
//! The spec declares services, their dependency edges, and the quality
//! rules that gate each service's QA phase.

mod loader;
mod project;

pub use loader::load_project_spec;
pub use project::{CompareOp, ProjectSpec, QualityRule, ServiceKind, ServiceSpec};
