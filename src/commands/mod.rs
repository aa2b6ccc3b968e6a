//! Command dispatch and handlers.

pub mod plan;
pub mod run;

use crate::cli::Command;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Plan { spec } => plan::run(spec),
        Command::Run {
            spec,
            project_root,
            max_retries,
            concurrency,
            skip_push,
            timeout_secs,
            backend,
            model,
        } => run::run(&run::RunArgs {
            spec: spec.clone(),
            project_root: project_root.clone(),
            max_retries: *max_retries,
            concurrency: *concurrency,
            skip_push: *skip_push,
            timeout_secs: *timeout_secs,
            backend: *backend,
            model: model.clone(),
        }),
    }
}
