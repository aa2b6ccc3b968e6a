//! Live version control shelling out to the `git` CLI.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::ports::{CommitFuture, CommitRef, PushFuture, VersionControl};

/// Version control adapter driving the `git` CLI in a project
/// workspace.
///
/// Each port call runs its git commands on the blocking pool; a slow
/// commit or push never occupies the async executor.
pub struct GitCliVcs {
    project_root: PathBuf,
    branch: String,
}

impl GitCliVcs {
    /// Creates an adapter operating on `project_root`, pushing to
    /// `origin/<branch>`.
    #[must_use]
    pub fn new(project_root: PathBuf, branch: impl Into<String>) -> Self {
        Self { project_root, branch: branch.into() }
    }
}

fn git(project_root: &Path, args: &[&str]) -> Result<String, Box<dyn Error + Send + Sync>> {
    let output = Command::new("git").current_dir(project_root).args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("git {} failed: {stderr}", args.join(" ")).into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl VersionControl for GitCliVcs {
    fn commit(&self, message: &str) -> CommitFuture<'_> {
        let root = self.project_root.clone();
        let message = message.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                git(&root, &["add", "-A"])?;
                // An empty tree is not an error: the generator may have
                // made no changes a second attempt needed.
                let status = git(&root, &["status", "--porcelain"])?;
                if !status.is_empty() {
                    git(&root, &["commit", "-m", &message])?;
                }
                let hash = git(&root, &["rev-parse", "HEAD"])?;
                Ok(CommitRef { hash })
            })
            .await
            .map_err(|e| format!("git task panicked: {e}"))?
        })
    }

    fn push(&self, _commit: &CommitRef) -> PushFuture<'_> {
        let root = self.project_root.clone();
        let branch = self.branch.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                git(&root, &["push", "origin", &format!("{branch}:{branch}")])?;
                Ok(())
            })
            .await
            .map_err(|e| format!("git task panicked: {e}"))?
        })
    }
}
