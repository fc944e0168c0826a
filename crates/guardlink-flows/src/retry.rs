//! Opt-in retry for façade calls.
//!
//! Nothing in the flows retries on its own. A caller that wants retries
//! wraps the call:
//!
//! ```ignore
//! let out = with_retry(&policy, || flows.summarize_call(input.clone())).await?;
//! ```
//!
//! Only errors with [`FlowError::is_retryable`] are retried, with
//! exponential backoff capped at `max_delay` and `±jitter_factor` jitter.

use std::future::Future;
use std::time::Duration;

use guardlink_core::FlowError;
use rand::Rng;
use tracing::warn;

/// Retry configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Relative jitter applied to each delay, `0.0..=1.0`.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (0-based), jitter included.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = 2u32
            .checked_pow(attempt)
            .and_then(|m| self.base_delay.checked_mul(m))
            .map_or(self.max_delay, |d| d.min(self.max_delay));

        let jitter = self.jitter_factor.clamp(0.0, 1.0);
        if jitter <= 0.0 {
            return exp;
        }
        let factor = rand::rng().random_range(1.0 - jitter..=1.0 + jitter);
        Duration::try_from_secs_f64(exp.as_secs_f64() * factor).unwrap_or(exp)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are used up. The last error is returned.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, FlowError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FlowError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error_kind = err.kind(),
                    error = %err,
                    "retrying flow call"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
