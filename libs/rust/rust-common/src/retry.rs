//! Bounded retry with pluggable backoff.
//!
//! An operation is attempted at most `max_attempts` times in total. Only
//! errors whose [`Retryable::is_retryable`] reports `true` trigger another
//! attempt; any other error is returned as soon as it is observed.

use std::future::Future;
use std::time::Duration;

use crate::Retryable;

/// Delay strategy between two attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    Immediate,
    /// Sleep the same amount before every retry.
    Fixed(Duration),
    /// Exponential backoff capped at `max`, with up to 25% jitter.
    Exponential {
        /// Delay before the first retry
        initial: Duration,
        /// Upper bound for any single delay
        max: Duration,
        /// Growth factor per retry
        multiplier: f64,
        /// Whether to add jitter
        jitter: bool,
    },
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay between attempts
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Immediate,
        }
    }
}

impl RetryConfig {
    /// Set the total attempt budget. Values below one are raised to one.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Retry policy for executing operations with automatic retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a retry policy with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Delay to wait after the given (zero-based) failed attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match &self.config.backoff {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                initial,
                max,
                multiplier,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let base_ms = initial.as_millis() as f64 * multiplier.powi(exponent);
                let capped_ms = base_ms.min(max.as_millis() as f64);
                let delay_ms = if *jitter {
                    capped_ms * (1.0 + rand::random::<f64>() * 0.25)
                } else {
                    capped_ms
                };
                Duration::from_millis(delay_ms as u64)
            }
        }
    }

    /// Whether a failure on the given zero-based attempt earns another one.
    #[must_use]
    pub fn should_retry<E: Retryable>(&self, error: &E, attempt: u32) -> bool {
        attempt + 1 < self.config.max_attempts && error.is_retryable()
    }

    /// Execute an async operation with retries.
    ///
    /// The closure is invoked afresh for every attempt, so the whole body
    /// runs again.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once the
    /// attempt budget is spent.
    pub async fn execute<F, Fut, T, E>(&self, name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        tracing::debug!(operation = name, attempt = attempt + 1, "succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !self.should_retry(&error, attempt) {
                        if attempt > 0 && error.is_retryable() {
                            tracing::debug!(
                                operation = name,
                                attempts = attempt + 1,
                                error = %error,
                                "retry budget exhausted",
                            );
                        }
                        return Err(error);
                    }
                    let delay = self.delay_for_attempt(attempt);
                    tracing::debug!(
                        operation = name,
                        attempt = attempt + 1,
                        max_attempts = self.config.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "transient failure, retrying",
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Get the total attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlatformError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff, Backoff::Immediate);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let config = RetryConfig::default().with_max_attempts(0);
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_exponential_delay_no_jitter() {
        let policy = RetryPolicy::new(RetryConfig::default().with_backoff(Backoff::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(250),
            multiplier: 2.0,
            jitter: false,
        }));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(250));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::with_defaults();
        let transient = PlatformError::unavailable("down");

        assert!(policy.should_retry(&transient, 0));
        assert!(policy.should_retry(&transient, 1));
        assert!(!policy.should_retry(&transient, 2));
        assert!(!policy.should_retry(&PlatformError::internal("bad"), 0));
    }

    #[tokio::test]
    async fn test_transient_failure_uses_full_budget() {
        let policy = RetryPolicy::with_defaults();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), PlatformError> = policy
            .execute("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PlatformError::timeout("slow"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_attempted_once() {
        let policy = RetryPolicy::with_defaults();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), PlatformError> = policy
            .execute("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PlatformError::internal("WRONGTYPE"))
            })
            .await;

        assert!(matches!(result, Err(PlatformError::Internal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_on_second_attempt() {
        let policy = RetryPolicy::with_defaults();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<u32, PlatformError> = policy
            .execute("test", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(PlatformError::unavailable("blip"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
