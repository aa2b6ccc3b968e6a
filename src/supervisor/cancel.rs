//! Run-level cancellation signal.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A latching cancellation flag shared between the driving loop, unit
/// workers, and whatever raises the signal (Ctrl-C, a test).
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether the signal has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the signal is raised; immediately if it already
    /// was.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let flag = Arc::new(CancelFlag::new());
        assert!(!flag.is_cancelled());

        let waiter = {
            let flag = Arc::clone(&flag);
            tokio::spawn(async move { flag.cancelled().await })
        };
        flag.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(flag.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_set() {
        let flag = CancelFlag::new();
        flag.cancel();
        tokio::time::timeout(Duration::from_millis(50), flag.cancelled()).await.unwrap();
    }
}
