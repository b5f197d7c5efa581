//! Retry and failure policies of the batch publisher.
//!
//! The unit of retry is a single stage of a single address: a retried
//! upload re-sends the same record, a retried seal draws a fresh key. What
//! happens once retries are exhausted is decided by [`FailurePolicy`].

use std::str::FromStr;
use std::time::Duration;

use crate::credential::CredentialError;

/// Bounded exponential backoff for retryable stage failures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per stage, including the first one. `1` disables retries.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Factor applied to the delay after every retry.
    pub multiplier: u32,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2,
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self::default()
    }

    /// Default backoff with `max_attempts` total attempts.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Whether a failure on attempt number `attempt` (1-based) is retried.
    pub fn should_retry(&self, attempt: u32, error: &CredentialError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// What to do with an address whose processing failed for good.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FailurePolicy {
    /// Halt the run; the current chunk's audit file is not written.
    #[default]
    Abort,
    /// Leave the address out of the chunk, record it in the run summary and
    /// continue with the next one.
    SkipAddress,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" | "skip-address" => Ok(FailurePolicy::SkipAddress),
            other => Err(format!(
                "unknown failure policy {other:?} (expected \"abort\" or \"skip\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_fail_fast() {
        let policy = RetryPolicy::default();
        let err = CredentialError::UploadFailed("502".into());
        assert!(!policy.should_retry(1, &err));
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }

    #[test]
    fn only_retryable_errors_are_retried_within_budget() {
        let policy = RetryPolicy::with_attempts(3);
        let transient = CredentialError::EncryptionNetworkError("timeout".into());
        let permanent = CredentialError::PolicyRejected("bad shape".into());

        assert!(policy.should_retry(1, &transient));
        assert!(policy.should_retry(2, &transient));
        assert!(!policy.should_retry(3, &transient));
        assert!(!policy.should_retry(1, &permanent));
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2,
            max_backoff: Duration::from_millis(500),
        };

        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn zero_attempts_are_clamped_to_one() {
        assert_eq!(RetryPolicy::with_attempts(0).max_attempts, 1);
    }

    #[test]
    fn failure_policy_parses_from_cli_strings() {
        assert_eq!("abort".parse::<FailurePolicy>(), Ok(FailurePolicy::Abort));
        assert_eq!("Skip".parse::<FailurePolicy>(), Ok(FailurePolicy::SkipAddress));
        assert!("retry".parse::<FailurePolicy>().is_err());
    }
}
