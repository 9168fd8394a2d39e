//! Bounded retries with escalating backoff.
//!
//! Every network-dependent step runs through [`with_retry`]. Transient
//! failures are retried after an exponential backoff plus a fresh pacing
//! delay; anything else is returned at once without using the retry budget.

use std::thread;
use std::time::Duration;

use crate::config::{DEFAULT_MAX_ATTEMPTS, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_MS};
use crate::error::{FailureKind, HarvesterError, Result};
use crate::pacing::Pacer;

/// Retry budget and backoff curve.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub base_delay: Duration,
    /// Cap on a single backoff.
    pub max_delay: Duration,
    /// Growth factor between consecutive backoffs.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Standard backoff (1 s doubling up to 6 s) with the given budget.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
            multiplier: 2.0,
        }
    }

    /// Retries without any backoff. Used by tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::new(max_attempts)
        }
    }

    /// Backoff taken before retry number `retry` (1 for the first retry).
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use legalacts_harvester::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(5);
    /// assert_eq!(policy.backoff(1), Duration::from_secs(1));
    /// assert_eq!(policy.backoff(2), Duration::from_secs(2));
    /// assert_eq!(policy.backoff(4), Duration::from_secs(6));
    /// ```
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(30) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Run `action` until it succeeds, fails non-transiently, or the budget runs out.
///
/// `classify` decides which failures are worth another attempt. Before each
/// retry the executor sleeps for the policy's backoff and then for a pacing
/// delay. When the budget is used up the last error is wrapped in
/// [`HarvesterError::RetriesExhausted`].
pub fn with_retry<T, F, C>(
    policy: &RetryPolicy,
    pacer: &Pacer,
    what: &str,
    classify: C,
    mut action: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
    C: Fn(&HarvesterError) -> FailureKind,
{
    let mut attempt = 1;
    loop {
        let error = match action() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if classify(&error) != FailureKind::Transient {
            tracing::debug!(what, error = %error, "Not retrying");
            return Err(error);
        }

        if attempt >= policy.max_attempts {
            return Err(HarvesterError::RetriesExhausted {
                attempts: attempt,
                source: Box::new(error),
            });
        }

        let delay = policy.backoff(attempt);
        tracing::warn!(
            what,
            error = %error,
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Transient failure, will retry"
        );
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        pacer.pace();
        attempt += 1;
    }
}

/// [`with_retry`] with the default classification, [`HarvesterError::kind`].
pub fn retry_transient<T, F>(policy: &RetryPolicy, pacer: &Pacer, what: &str, action: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    with_retry(policy, pacer, what, HarvesterError::kind, action)
}
