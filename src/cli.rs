//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Default Anthropic model used by the live code-generation backend.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Top-level CLI parser for `foreman`.
#[derive(Debug, Parser)]
#[command(name = "foreman", version, about = "Supervise build-and-fix runs over a project spec")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Which collaborator set backs a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Live collaborators: Anthropic code generation, shell builds,
    /// git CLI.
    Anthropic,
    /// In-memory scripted collaborators; no network, containers, or
    /// git. Useful for exercising a spec's scheduling.
    Mock,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a project spec and print the execution order.
    Plan {
        /// Path to the project spec YAML file.
        spec: PathBuf,
    },
    /// Drive every service through implement, build, test, QA, and
    /// commit.
    Run {
        /// Path to the project spec YAML file.
        spec: PathBuf,
        /// Directory the generated project lives in.
        #[arg(long, default_value = ".")]
        project_root: PathBuf,
        /// Fix cycles permitted per unit after its first failure.
        #[arg(long, default_value_t = 3)]
        max_retries: u32,
        /// Independent units driven in parallel.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
        /// Commit locally but never push to the remote.
        #[arg(long)]
        skip_push: bool,
        /// Timeout in seconds for each implement and build/test call.
        #[arg(long, default_value_t = 600)]
        timeout_secs: u64,
        /// Collaborator backend.
        #[arg(long, value_enum, default_value_t = Backend::Anthropic)]
        backend: Backend,
        /// Anthropic model for the live backend.
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
    },
}
