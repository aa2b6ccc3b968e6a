//! `run` command: execute a full supervised build-and-fix run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Backend;
use crate::context::Collaborators;
use crate::spec;
use crate::supervisor::{RunConfig, Supervisor, TracingSink};
use crate::unit::plan_units;

/// Resolved arguments for one run.
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Path to the project spec YAML file.
    pub spec: PathBuf,
    /// Directory the generated project lives in.
    pub project_root: PathBuf,
    /// Fix cycles permitted per unit after its first failure.
    pub max_retries: u32,
    /// Independent units driven in parallel.
    pub concurrency: usize,
    /// Commit locally but never push.
    pub skip_push: bool,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Collaborator backend.
    pub backend: Backend,
    /// Anthropic model for the live backend.
    pub model: String,
}

/// Loads the spec, wires collaborators, and drives every unit to a
/// terminal state. The final summary is printed to stdout.
///
/// # Errors
///
/// Returns an error string if the spec is invalid, the runtime cannot
/// start, or the run hits a fatal scheduler error. Unit failures are
/// not errors; they are reported in the summary and via the exit
/// status.
pub fn run(args: &RunArgs) -> Result<(), String> {
    if args.concurrency == 0 {
        return Err("--concurrency must be at least 1".to_string());
    }

    let project = spec::load_project_spec(&args.spec)?;
    let units = plan_units(&project);

    let collaborators = match args.backend {
        Backend::Anthropic => {
            Collaborators::live(&args.project_root, &project.branch, &args.model)
        }
        Backend::Mock => Collaborators::mock(),
    };
    let config = RunConfig {
        max_retries: args.max_retries,
        concurrency: args.concurrency,
        skip_push: args.skip_push,
        per_call_timeout: Duration::from_secs(args.timeout_secs),
        ..RunConfig::default()
    };

    // Graph validation happens here; a bad spec never starts a run.
    let supervisor = Supervisor::new(units, collaborators, config, Arc::new(TracingSink))
        .map_err(|e| e.to_string())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {e}"))?;

    let summary = runtime.block_on(async {
        let cancel = supervisor.cancel_flag();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; finishing in-flight units");
                cancel.cancel();
            }
        });
        supervisor.run().await
    });
    let summary = summary.map_err(|e| e.to_string())?;

    print!("{}", summary.render());
    if summary.failed > 0 || summary.blocked > 0 {
        return Err(format!(
            "{} unit(s) failed, {} blocked",
            summary.failed, summary.blocked
        ));
    }
    Ok(())
}
