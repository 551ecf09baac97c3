use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{PandoraError, Res, config};

/// Fixed-interval, bounded retry.
///
/// The operation is attempted once immediately and then once per `interval`
/// until it succeeds or `attempts` invocations have been made. There is no
/// backoff and no jitter. Errors that retrying cannot fix (shape, auth,
/// premium) end the sequence at once; reaching the cap yields
/// [`PandoraError::RetryExhausted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: config::DEFAULT_RETRY_ATTEMPTS,
            interval: Duration::from_secs(config::DEFAULT_RETRY_INTERVAL_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }

    pub fn from_config() -> Self {
        Self::new(config::retry_attempts(), config::retry_interval())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn retry<T, F, Fut>(&self, mut operation: F) -> Res<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Res<T>>,
    {
        let mut last = String::new();

        for attempt in 1..=self.attempts {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    warn!(attempt, attempts = self.attempts, error = %err, "attempt failed");
                    last = err.to_string();
                    if attempt < self.attempts {
                        sleep(self.interval).await;
                    }
                }
            }
        }

        Err(PandoraError::RetryExhausted {
            attempts: self.attempts,
            last,
        })
    }
}
