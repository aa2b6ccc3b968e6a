//! Recording version-control adapter.

use std::error::Error;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::ports::{CommitFuture, CommitRef, PushFuture, VersionControl};

/// Version control that records commits and pushes in memory.
#[derive(Debug, Default)]
pub struct RecordingVcs {
    commits: Mutex<Vec<String>>,
    pushes: Mutex<Vec<String>>,
    fail_push: AtomicBool,
    commit_delay: Mutex<Option<Duration>>,
}

impl RecordingVcs {
    /// Creates a recorder whose commits and pushes always succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent pushes fail.
    pub fn fail_pushes(&self) {
        self.fail_push.store(true, Ordering::SeqCst);
    }

    /// Makes each subsequent commit sleep for `delay` before
    /// recording; used to exercise a slow repository.
    pub fn delay_commits(&self, delay: Duration) {
        *self.commit_delay.lock().expect("delay lock poisoned") = Some(delay);
    }

    /// Commit messages in commit order.
    #[must_use]
    pub fn commit_messages(&self) -> Vec<String> {
        self.commits.lock().expect("commits lock poisoned").clone()
    }

    /// Hashes of commits that were pushed, in push order.
    #[must_use]
    pub fn pushed(&self) -> Vec<String> {
        self.pushes.lock().expect("pushes lock poisoned").clone()
    }
}

impl VersionControl for RecordingVcs {
    fn commit(&self, message: &str) -> CommitFuture<'_> {
        let message = message.to_string();
        let delay = *self.commit_delay.lock().expect("delay lock poisoned");
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut commits = self.commits.lock().expect("commits lock poisoned");
            commits.push(message);
            Ok(CommitRef { hash: format!("commit-{}", commits.len()) })
        })
    }

    fn push(&self, commit: &CommitRef) -> PushFuture<'_> {
        let hash = commit.hash.clone();
        Box::pin(async move {
            if self.fail_push.load(Ordering::SeqCst) {
                return Err::<(), Box<dyn Error + Send + Sync>>("remote rejected push".into());
            }
            self.pushes.lock().expect("pushes lock poisoned").push(hash);
            Ok(())
        })
    }
}
