//! Core library entry for the `foreman` CLI.
//!
//! `foreman` reads a declarative project spec, resolves service units
//! into a dependency graph, and supervises each unit through an
//! implement, build, test, quality-gate, and commit lifecycle with a
//! bounded retry budget.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod context;
pub mod errors;
pub mod gate;
pub mod graph;
pub mod ports;
pub mod spec;
pub mod store;
pub mod supervisor;
pub mod unit;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command
/// execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command)
}
