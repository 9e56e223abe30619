use std::time::Duration;

use crate::RetryPolicy;

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionOptions {
    /// Per-request timeout in milliseconds, used unless a call overrides it.
    pub timeout_ms: u64,
    /// Retry strategy shared by every request of the session.
    pub retry: RetryPolicy,
}

impl SessionOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetryPolicy::default(),
        }
    }
}
