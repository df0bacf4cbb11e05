// ABOUTME: Reusable retry policy with pluggable backoff and retryable-error predicate
// ABOUTME: Shared by image captioning retries and ingestion batch pacing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Retry and Backoff
//!
//! [`Backoff`] computes the pause before a numbered attempt; [`RetryPolicy`]
//! combines it with an attempt budget and a predicate deciding which
//! [`AppError`]s are worth retrying. Delays go through `tokio::time::sleep`,
//! so tests can run them on a paused clock.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::{AppError, ErrorCode};

/// Delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same pause every time
    Fixed(Duration),
    /// `base * n` before the n-th retry
    Linear(Duration),
    /// `initial * 2^(n-1)`, capped at `max`
    Exponential {
        /// First delay
        initial: Duration,
        /// Upper bound
        max: Duration,
    },
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match *self {
            Self::Fixed(delay) => delay,
            Self::Linear(base) => base.saturating_mul(attempt),
            Self::Exponential { initial, max } => {
                let factor = 1_u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }

    /// Sleep for the delay of `attempt`
    pub async fn wait(&self, attempt: u32) {
        let delay = self.delay_for_attempt(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Default predicate: transient provider failures are retried, anything the
/// caller or the configuration got wrong is not
#[must_use]
pub fn is_retryable(error: &AppError) -> bool {
    error.code.is_transient()
}

/// Retry everything except configuration and credential problems
#[must_use]
pub fn is_retryable_unless_misconfigured(error: &AppError) -> bool {
    !matches!(
        error.code,
        ErrorCode::ConfigMissing | ErrorCode::ConfigError | ErrorCode::ExternalAuthFailed
    )
}

/// Attempt budget plus backoff plus retryable-error predicate
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    /// Delay schedule between attempts
    pub backoff: Backoff,
    retryable: fn(&AppError) -> bool,
}

impl RetryPolicy {
    /// Policy retrying transient errors
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            retryable: is_retryable,
        }
    }

    /// Replace the retryable-error predicate
    #[must_use]
    pub fn with_predicate(mut self, retryable: fn(&AppError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Whether `error` may be retried under this policy
    #[must_use]
    pub fn should_retry(&self, error: &AppError) -> bool {
        (self.retryable)(error)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error or
    /// the attempt budget is spent. The closure receives the 1-based attempt.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `operation`
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, AppError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < self.max_attempts && self.should_retry(&e) => {
                    let delay = self.backoff.delay_for_attempt(attempt);
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Attempt failed, retrying: {}",
                        e
                    );
                    self.backoff.wait(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Giving up: {}",
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_linear_delays_strictly_increase() {
        let backoff = Backoff::Linear(Duration::from_millis(1000));
        let delays: Vec<_> = (1..=4).map(|n| backoff.delay_for_attempt(n)).collect();
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(delays[0], Duration::from_secs(1));
        assert_eq!(delays[2], Duration::from_secs(3));
    }

    #[test]
    fn test_exponential_is_capped() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(3),
        };
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(3));
        assert_eq!(backoff.delay_for_attempt(64), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exhausts_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Backoff::Linear(Duration::from_secs(1)));
        let start = Instant::now();

        let result: Result<(), AppError> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::external_service("svc", "down")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_non_retryable() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Backoff::Fixed(Duration::from_secs(1)));

        let result: Result<(), AppError> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::external_auth("svc", "bad key")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_recovers() {
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_millis(10)));
        let value = policy
            .run("test", |attempt| async move {
                if attempt < 2 {
                    Err(AppError::external_rate_limited("svc", "slow down"))
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[test]
    fn test_misconfiguration_predicate() {
        assert!(!is_retryable_unless_misconfigured(&AppError::config_missing(
            "no key"
        )));
        assert!(is_retryable_unless_misconfigured(&AppError::internal(
            "odd response"
        )));
    }
}
