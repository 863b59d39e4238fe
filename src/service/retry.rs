//! Read retry policy.
//!
//! Exponential backoff over a fixed attempt budget: the delay before attempt `n + 1` is
//! `base_delay * 2^(n - 1)`. Only retryable errors (transport failures) are retried, and
//! only read paths use this policy. Writes are never retried.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::ServiceConfig;
use crate::error::{EggnsError, Result};

/// Failed attempt, classified by whether another attempt can change the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    Retryable(EggnsError),
    /// Returned at once, whatever budget is left
    Fatal(EggnsError),
}

impl AttemptError {
    pub fn into_inner(self) -> EggnsError {
        match self {
            AttemptError::Retryable(e) | AttemptError::Fatal(e) => e,
        }
    }
}

impl From<EggnsError> for AttemptError {
    fn from(e: EggnsError) -> Self {
        if e.is_retryable() {
            AttemptError::Retryable(e)
        } else {
            AttemptError::Fatal(e)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(service: &ServiceConfig) -> Self {
        Self::new(service.retry_attempts, service.retry_base_delay())
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    ///
    /// # Arguments
    ///
    /// * `label` - Operation name used in retry logs
    /// * `operation` - Produces one attempt per call
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - First successful attempt
    /// * `Err(EggnsError)` - First non-retryable error, or the last error once the budget
    ///   is spent
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_attempts(label, || {
            let attempt = operation();
            async move { attempt.await.map_err(AttemptError::from) }
        })
        .await
    }

    /// Same loop as [`RetryPolicy::run`], with the caller classifying each failure.
    ///
    /// Used when the same error kind can be worth retrying or not depending on where it
    /// came from, e.g. a cached unavailable chain versus a failed call on a live one.
    pub async fn run_attempts<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Retryable(e)) if attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        label, attempt, self.max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into_inner()),
            }
        }
    }
}
