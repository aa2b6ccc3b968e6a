//! Live adapters for real external interactions.

pub mod builder;
pub mod clock;
pub mod codegen;
pub mod vcs;

pub use builder::ShellBuildRunner;
pub use clock::LiveClock;
pub use codegen::AnthropicCodeGenerator;
pub use vcs::GitCliVcs;
