//! Bounded retries with capped exponential backoff
//!
//! Used by the remote artifact store, where connection errors, 5xx and 429
//! responses are usually transient. Everything else fails on first sight.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; never less than 1
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Object storage uploads and downloads
    pub fn storage() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }

    /// Millisecond delays for tests against local fakes
    pub fn fast() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
        }
    }

    pub fn attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Upper bound of the wait after the `failures`-th failed attempt (1-based)
    pub fn ceiling(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Wait drawn uniformly from the upper half of the ceiling
    fn backoff(&self, failures: u32) -> Duration {
        let ceiling = self.ceiling(failures);
        let half = ceiling / 2;
        if half.is_zero() {
            return ceiling;
        }
        half + rand::thread_rng().gen_range(Duration::ZERO..=half)
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget runs out. Returns the last outcome and the number of
    /// attempts made.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        label: &str,
        op: F,
        transient: P,
    ) -> (Result<T, E>, u32)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(label, attempt, "Recovered after retry");
                    }
                    return (Ok(value), attempt);
                }
                Err(e) => e,
            };

            if attempt >= max_attempts || !transient(&err) {
                return (Err(err), attempt);
            }

            let wait = self.backoff(attempt);
            warn!(
                label,
                attempt,
                max_attempts,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "Transient failure, retrying"
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
