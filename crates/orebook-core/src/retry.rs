//! Retry executor with full-jitter exponential backoff and per-attempt
//! timeout racing.
//!
//! Every fallible fetch goes through [`execute`]: each attempt races the
//! operation against a timeout, client errors short-circuit (429 excepted),
//! and everything else retries up to the policy cap. Failure never
//! propagates past this boundary; callers receive a [`FailureReason`] and
//! treat the field as unavailable.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::Duration;

use crate::FetchError;

/// Bounds for the retry loop. Total attempts = `max_retries + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Initial backoff; doubles each attempt.
    pub base_delay: Duration,
    /// Cap on the computed exponential delay (before jitter).
    pub max_delay: Duration,
    /// Per-attempt timeout budget.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting, for tests that only count attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            attempt_timeout: Duration::from_secs(10),
        }
    }

    /// Full-jitter exponential backoff: `base * 2^attempt` capped at
    /// `max_delay`, plus a random jitter in `[0, delay]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scale = 2f64.powi(attempt.min(30) as i32);
        let exponential = self.base_delay.as_secs_f64() * scale;
        let capped = exponential.min(self.max_delay.as_secs_f64());

        let capped_ms = (capped * 1000.0) as u64;
        let jitter_ms = if capped_ms == 0 {
            0
        } else {
            fastrand::u64(0..=capped_ms)
        };
        Duration::from_millis(capped_ms + jitter_ms)
    }
}

/// Terminal failure classification logged when [`execute`] gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The final attempt timed out.
    Timeout,
    /// Terminal HTTP-style client error (4xx other than 429).
    ClientError(u16),
    /// The response could not be decoded into the expected shape.
    MalformedResponse,
    /// Retryable failures exhausted the retry budget.
    MaxRetriesExceeded,
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => f.write_str("Timeout"),
            Self::ClientError(code) => write!(f, "ClientError:{code}"),
            Self::MalformedResponse => f.write_str("MalformedResponse"),
            Self::MaxRetriesExceeded => f.write_str("MaxRetriesExceeded"),
        }
    }
}

/// Run a fallible async operation under a retry policy.
///
/// Semantics:
/// - each attempt races `op()` against `policy.attempt_timeout`; a timeout
///   cancels that attempt and counts as retryable;
/// - a 4xx status is terminal with no retry, except 429 which is retryable;
/// - any other failure retries up to `max_retries` with full-jitter
///   exponential backoff between attempts.
///
/// Gives up with a logged [`FailureReason`]; never panics or propagates the
/// underlying error.
pub async fn execute<T, F, Fut>(mut op: F, policy: &RetryPolicy) -> Result<T, FailureReason>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let error = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => error,
            Err(_) => FetchError::Timeout,
        };

        if !error.retryable() {
            let reason = match error {
                FetchError::Status(code) => FailureReason::ClientError(code),
                _ => FailureReason::MalformedResponse,
            };
            tracing::warn!(attempt, %reason, %error, "fetch failed terminally");
            return Err(reason);
        }

        if attempt >= policy.max_retries {
            let reason = match error {
                FetchError::Timeout => FailureReason::Timeout,
                _ => FailureReason::MaxRetriesExceeded,
            };
            tracing::warn!(attempt, %reason, %error, "fetch retries exhausted");
            return Err(reason);
        }

        let delay = policy.delay_for_attempt(attempt);
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, %error, "retrying fetch");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
