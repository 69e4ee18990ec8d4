//! Retry with exponential backoff for transient service errors.

use crate::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff tuning for the analysis call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub base_delay: Duration,
    /// Growth factor applied per subsequent attempt.
    pub multiplier: f64,
    /// Random fraction in `[0, jitter]` added on top of each wait.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Wait after attempt `attempt` failed, before jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .mul_f64(self.multiplier.powi(attempt as i32 - 1))
    }

    /// Full wait after attempt `attempt` failed, jitter included.
    fn delay_after(&self, attempt: u32) -> Duration {
        let base = self.backoff(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let fraction = rand::thread_rng().gen_range(0.0..=self.jitter);
        base.mul_f64(1.0 + fraction)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy's
/// attempt budget is spent.
///
/// Only errors reporting themselves transient are retried; anything else
/// surfaces after the attempt that produced it. The wait between attempts
/// suspends the current task only.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "Attempt {}/{} failed ({}), retrying in {:?}",
                    attempt, policy.max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
