//! Version-control port for persisting verified work.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

/// Boxed future type alias used by [`VersionControl::commit`] to keep
/// the trait dyn-compatible.
pub type CommitFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CommitRef, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// Boxed future type alias used by [`VersionControl::push`].
pub type PushFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// Reference to a commit created by [`VersionControl::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    /// Commit hash (or adapter-specific identifier).
    pub hash: String,
}

/// Commits and publishes verified changes.
///
/// The supervisor serializes calls to this port globally: two units'
/// commit/push sequences are never interleaved. Implementations must
/// not block the calling thread; process-spawning adapters run their
/// work on a blocking pool so concurrent workers' timers keep firing.
pub trait VersionControl: Send + Sync {
    /// Stages all workspace changes and commits them with `message`.
    ///
    /// The returned future resolves to an error if staging or
    /// committing fails.
    fn commit(&self, message: &str) -> CommitFuture<'_>;

    /// Pushes a previously created commit to the remote.
    ///
    /// The returned future resolves to an error if the push fails; the
    /// caller reports this but does not revert the local commit.
    fn push(&self, commit: &CommitRef) -> PushFuture<'_>;
}
