//! Live build runner shelling out to a per-service build command.

use std::path::PathBuf;
use std::process::Command;

use crate::gate;
use crate::ports::{BuildFuture, BuildReport, BuildRunner};
use crate::spec::ServiceKind;
use crate::unit::Unit;

/// Build runner that executes each unit's build/test command in the
/// system shell, from the project workspace.
///
/// Units without a declared `build_command` get a container-based
/// default for their kind. Metric lines (`NAME: VALUE`) in the
/// combined output become the report's observations.
pub struct ShellBuildRunner {
    project_root: PathBuf,
}

impl ShellBuildRunner {
    /// Creates a runner executing commands from `project_root`.
    #[must_use]
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    fn command_for(unit: &Unit) -> String {
        if let Some(command) = &unit.build_command {
            return command.clone();
        }
        let name = &unit.name;
        match unit.kind {
            ServiceKind::Ml | ServiceKind::Audio => format!(
                "docker compose build {name} && docker compose run --rm {name} python -m qa"
            ),
            _ => format!(
                "docker compose build {name} && docker compose run --rm {name} ./run_tests.sh"
            ),
        }
    }
}

impl BuildRunner for ShellBuildRunner {
    fn build_and_test(&self, unit: &Unit) -> BuildFuture<'_> {
        let command = Self::command_for(unit);
        let cwd = self.project_root.clone();
        Box::pin(async move {
            let output = tokio::task::spawn_blocking(move || {
                Command::new("sh").arg("-c").arg(&command).current_dir(&cwd).output()
            })
            .await
            .map_err(|e| format!("build task panicked: {e}"))??;

            let mut raw_output = String::from_utf8_lossy(&output.stdout).into_owned();
            raw_output.push_str(&String::from_utf8_lossy(&output.stderr));
            let metrics = gate::parse_metrics(&raw_output);
            Ok(BuildReport { passed: output.status.success(), raw_output, metrics })
        })
    }
}
