//! Run configuration.

use std::time::Duration;

/// Options recognized by a supervised run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of Fix cycles permitted after a first failure; a unit
    /// gets at most `max_retries + 1` Implement calls.
    pub max_retries: u32,
    /// Number of independent units driven in parallel; 1 is the
    /// deterministic default.
    pub concurrency: usize,
    /// Skip remote publication; local commits still happen.
    pub skip_push: bool,
    /// Timeout applied to each Implement and Build+Test call. A
    /// timed-out call consumes one attempt.
    pub per_call_timeout: Duration,
    /// How long cancellation waits for in-flight work before marking
    /// it failed.
    pub grace_period: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            concurrency: 1,
            skip_push: false,
            per_call_timeout: Duration::from_secs(600),
            grace_period: Duration::from_secs(10),
        }
    }
}
