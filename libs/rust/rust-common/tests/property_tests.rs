//! Property-based tests for rust-common crate.
//!
//! These tests verify universal properties across all inputs using proptest.

use proptest::prelude::*;
use rust_common::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, PlatformError, RetryConfig, RetryPolicy,
    Retryable,
};
use std::sync::atomic::{AtomicU32, Ordering};

// Transient errors are always retryable, everything else never is.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_error_classification_is_stable(msg in "[a-zA-Z0-9 ]{1,50}") {
        let transient = vec![
            PlatformError::unavailable(&msg),
            PlatformError::timeout(&msg),
        ];
        for err in transient {
            prop_assert!(err.is_retryable(), "Error {:?} should be retryable", err);
        }

        let permanent = vec![
            PlatformError::internal(&msg),
            PlatformError::serialization(&msg),
            PlatformError::invalid_input(&msg),
            PlatformError::circuit_open(&msg),
        ];
        for err in permanent {
            prop_assert!(!err.is_retryable(), "Error {:?} should not be retryable", err);
        }
    }
}

// A transient failure consumes exactly the configured attempt budget,
// a permanent one consumes exactly one attempt.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_retry_attempts_bounded(max_attempts in 1u32..8, transient in any::<bool>()) {
        let policy = RetryPolicy::new(RetryConfig::default().with_max_attempts(max_attempts));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), PlatformError> = tokio_test::block_on(policy.execute(
            "prop",
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if transient {
                    Err(PlatformError::unavailable("down"))
                } else {
                    Err(PlatformError::internal("rejected"))
                }
            },
        ));

        prop_assert!(result.is_err());
        let expected = if transient { max_attempts } else { 1 };
        prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
    }
}

// The breaker never opens before the request volume threshold is reached,
// and always opens once an all-failure window reaches it.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_breaker_respects_volume_threshold(threshold in 1u32..30, failures in 0u32..60) {
        let config = CircuitBreakerConfig::default().with_request_volume_threshold(threshold);
        let cb = CircuitBreaker::new("prop", config);

        let state = tokio_test::block_on(async {
            for _ in 0..failures {
                cb.record_failure().await;
            }
            cb.state().await
        });

        if failures >= threshold {
            prop_assert_eq!(state, CircuitState::Open);
        } else {
            prop_assert_eq!(state, CircuitState::Closed);
        }
    }

    #[test]
    fn prop_breaker_error_percentage(successes in 0u32..50, failures in 0u32..50) {
        let config = CircuitBreakerConfig::default()
            .with_request_volume_threshold(u32::MAX);
        let cb = CircuitBreaker::new("prop", config);

        let health = tokio_test::block_on(async {
            for _ in 0..successes {
                cb.record_success().await;
            }
            for _ in 0..failures {
                cb.record_failure().await;
            }
            cb.health().await
        });

        prop_assert_eq!(health.total, successes + failures);
        prop_assert_eq!(health.failures, failures);
        prop_assert!(health.error_percentage() <= 100);
    }
}
