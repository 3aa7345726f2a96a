//! Resiliency policies for lifecycle operations.
//!
//! Every lifecycle call runs through [`ResiliencyRegistry::execute`] under a
//! stable [`PolicyKey`]. Each key owns one bulkhead, one circuit breaker and
//! one retry policy for the lifetime of the registry, shared by all tenants.
//!
//! Order of admission: bulkhead permit, then breaker check, then the body
//! with bounded retry. The breaker records one outcome per call, after
//! retries. A [`TokenError::NotFound`] outcome is a healthy answer from the
//! store and is recorded as a success.

pub mod bulkhead;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use rust_common::{CircuitBreaker, CircuitBreakerConfig, PlatformError, RetryConfig, RetryPolicy};
use tracing::{debug, error, warn};

use crate::error::TokenError;
use crate::metrics::{self, Outcome};

pub use bulkhead::{Bulkhead, BulkheadConfig, BulkheadError, SaturationPolicy};

/// Token kind an operation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Rotating access/refresh pairs
    Dynamic,
    /// Long-lived static tokens
    Static,
}

impl Domain {
    /// Label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dynamic => "Dynamic",
            Self::Static => "Static",
        }
    }
}

/// Lifecycle operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Issue and store a token
    Generate,
    /// Read a record
    Get,
    /// Rotate a dynamic pair
    Refresh,
    /// Disable, absent when missing
    Disable,
    /// Disable, not-found when missing
    DisableStrict,
    /// Back-date a dynamic pair's expiry
    Expire,
    /// Remove a dynamic record
    Clear,
}

impl Operation {
    /// Label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "Generate",
            Self::Get => "Get",
            Self::Refresh => "Refresh",
            Self::Disable => "Disable",
            Self::DisableStrict => "DisableStrict",
            Self::Expire => "Expire",
            Self::Clear => "Clear",
        }
    }
}

/// Stable `(domain, operation)` pair naming a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolicyKey {
    /// Token kind
    pub domain: Domain,
    /// Operation
    pub operation: Operation,
}

impl PolicyKey {
    /// Every pair a lifecycle operation runs under.
    pub const ALL: [Self; 11] = [
        Self::new(Domain::Dynamic, Operation::Generate),
        Self::new(Domain::Dynamic, Operation::Get),
        Self::new(Domain::Dynamic, Operation::Refresh),
        Self::new(Domain::Dynamic, Operation::Disable),
        Self::new(Domain::Dynamic, Operation::DisableStrict),
        Self::new(Domain::Dynamic, Operation::Expire),
        Self::new(Domain::Dynamic, Operation::Clear),
        Self::new(Domain::Static, Operation::Generate),
        Self::new(Domain::Static, Operation::Get),
        Self::new(Domain::Static, Operation::Disable),
        Self::new(Domain::Static, Operation::DisableStrict),
    ];

    /// Create a policy key.
    #[must_use]
    pub const fn new(domain: Domain, operation: Operation) -> Self {
        Self { domain, operation }
    }
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain.as_str(), self.operation.as_str())
    }
}

/// Retry, breaker and bulkhead settings for one policy.
#[derive(Debug, Clone, Default)]
pub struct ResiliencyConfig {
    /// Retry settings
    pub retry: RetryConfig,
    /// Breaker settings
    pub breaker: CircuitBreakerConfig,
    /// Bulkhead settings
    pub bulkhead: BulkheadConfig,
}

/// Live resiliency state of one policy key.
#[derive(Debug)]
pub struct OperationPolicy {
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    bulkhead: Bulkhead,
}

impl OperationPolicy {
    fn new(key: PolicyKey, config: &ResiliencyConfig) -> Self {
        Self {
            retry: RetryPolicy::new(config.retry.clone()),
            breaker: CircuitBreaker::new(key.to_string(), config.breaker.clone()),
            bulkhead: Bulkhead::new(config.bulkhead.clone()),
        }
    }

    /// The breaker guarding this policy.
    #[must_use]
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The bulkhead guarding this policy.
    #[must_use]
    pub const fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    /// The retry policy.
    #[must_use]
    pub const fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Owner of every [`OperationPolicy`].
#[derive(Debug)]
pub struct ResiliencyRegistry {
    policies: HashMap<PolicyKey, OperationPolicy>,
}

impl ResiliencyRegistry {
    /// Build one policy per key from shared defaults.
    #[must_use]
    pub fn new(defaults: &ResiliencyConfig) -> Self {
        let policies = PolicyKey::ALL
            .iter()
            .map(|key| (*key, OperationPolicy::new(*key, defaults)))
            .collect();
        Self { policies }
    }

    /// Replace the policy of one key.
    #[must_use]
    pub fn with_override(mut self, key: PolicyKey, config: &ResiliencyConfig) -> Self {
        self.policies.insert(key, OperationPolicy::new(key, config));
        self
    }

    /// Policy registered for a key.
    #[must_use]
    pub fn policy(&self, key: PolicyKey) -> Option<&OperationPolicy> {
        self.policies.get(&key)
    }

    /// Run an operation body under the key's policy.
    ///
    /// The body is invoked afresh for every attempt. Only transient store
    /// failures are retried.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::NotFound`] unchanged. Every other failure,
    /// including a rejected call, becomes [`TokenError::OperationFailed`].
    pub async fn execute<F, Fut, T>(&self, key: PolicyKey, mut operation: F) -> Result<T, TokenError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TokenError>>,
    {
        let Some(policy) = self.policies.get(&key) else {
            metrics::record_operation(key, Outcome::Rejected);
            return Err(TokenError::operation_failed(format!("no resiliency policy for {key}")));
        };
        let _timer = metrics::start_timer(key);

        let _permit = match policy.bulkhead.acquire().await {
            Ok(permit) => permit,
            Err(err) => {
                warn!(policy = %key, error = %err, "call rejected by bulkhead");
                metrics::record_rejection(key, "bulkhead");
                metrics::record_operation(key, Outcome::Rejected);
                return Err(TokenError::operation_failed(format!("{key}: {err}")));
            }
        };

        if !policy.breaker.allow_request().await {
            debug!(policy = %key, "call short-circuited");
            metrics::record_rejection(key, "circuit_open");
            metrics::record_operation(key, Outcome::Rejected);
            return Err(TokenError::operation_failed(
                PlatformError::circuit_open(key.to_string()).to_string(),
            ));
        }

        let name = key.to_string();
        let mut attempts = 0u32;
        let result = policy
            .retry
            .execute(&name, || {
                attempts += 1;
                operation()
            })
            .await;
        metrics::record_retries(key, attempts.saturating_sub(1));

        match result {
            Ok(value) => {
                policy.breaker.record_success().await;
                metrics::record_operation(key, Outcome::Success);
                Ok(value)
            }
            Err(err) if err.is_not_found() => {
                policy.breaker.record_success().await;
                metrics::record_operation(key, Outcome::NotFound);
                debug!(policy = %key, "record not found");
                Err(err)
            }
            Err(err) => {
                policy.breaker.record_failure().await;
                metrics::record_operation(key, Outcome::Failed);
                error!(policy = %key, attempts, error = %err, "operation failed");
                Err(err.into_boundary())
            }
        }
    }
}

impl Default for ResiliencyRegistry {
    fn default() -> Self {
        Self::new(&ResiliencyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_common::CircuitState;
    use std::sync::atomic::{AtomicU32, Ordering};

    const KEY: PolicyKey = PolicyKey::new(Domain::Dynamic, Operation::Refresh);

    fn tripping() -> ResiliencyConfig {
        ResiliencyConfig {
            breaker: CircuitBreakerConfig::default().with_request_volume_threshold(2),
            ..ResiliencyConfig::default()
        }
    }

    #[test]
    fn test_policy_key_display() {
        assert_eq!(KEY.to_string(), "Dynamic.Refresh");
        assert_eq!(
            PolicyKey::new(Domain::Static, Operation::DisableStrict).to_string(),
            "Static.DisableStrict"
        );
    }

    #[test]
    fn test_registry_covers_every_key() {
        let registry = ResiliencyRegistry::default();
        for key in PolicyKey::ALL {
            assert!(registry.policy(key).is_some(), "missing {key}");
        }
        assert!(registry
            .policy(PolicyKey::new(Domain::Static, Operation::Refresh))
            .is_none());
    }

    #[tokio::test]
    async fn test_transient_failure_retried_then_mapped() {
        let registry = ResiliencyRegistry::default();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = registry
            .execute(KEY, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TokenError::Store(PlatformError::unavailable("refused")))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let err = result.unwrap_err();
        assert_eq!(err.code().as_str(), "PR000");
        assert!(err.to_string().contains("refused"));
    }

    #[tokio::test]
    async fn test_not_found_not_retried() {
        let registry = ResiliencyRegistry::default();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = registry
            .execute(KEY, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TokenError::not_found("app_tokens", "x"))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_not_found_does_not_trip_breaker() {
        let registry = ResiliencyRegistry::new(&tripping());

        for _ in 0..5 {
            let _: Result<(), _> = registry
                .execute(KEY, || async { Err(TokenError::not_found("s", "id")) })
                .await;
        }

        let breaker = registry.policy(KEY).unwrap().breaker();
        assert_eq!(breaker.state().await, CircuitState::Closed);
        assert_eq!(breaker.health().await.failures, 0);
    }

    #[tokio::test]
    async fn test_open_breaker_fails_fast() {
        let registry = ResiliencyRegistry::new(&tripping());
        for _ in 0..2 {
            let _: Result<(), _> = registry
                .execute(KEY, || async { Err(TokenError::signing("bad key")) })
                .await;
        }

        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = registry
            .execute(KEY, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let err = result.unwrap_err();
        assert!(matches!(err, TokenError::OperationFailed { .. }));
        assert_eq!(err.to_string(), "Circuit breaker open for Dynamic.Refresh");
    }

    #[tokio::test]
    async fn test_override_applies_to_one_key() {
        let strict = ResiliencyConfig {
            retry: RetryConfig::default().with_max_attempts(1),
            ..ResiliencyConfig::default()
        };
        let registry = ResiliencyRegistry::default().with_override(KEY, &strict);

        assert_eq!(registry.policy(KEY).unwrap().retry().max_attempts(), 1);
        let other = PolicyKey::new(Domain::Dynamic, Operation::Get);
        assert_eq!(registry.policy(other).unwrap().retry().max_attempts(), 3);
    }

    #[tokio::test]
    async fn test_saturated_bulkhead_rejects() {
        let config = ResiliencyConfig {
            bulkhead: BulkheadConfig::default()
                .with_max_concurrent(1)
                .with_saturation(SaturationPolicy::Reject),
            ..ResiliencyConfig::default()
        };
        let registry = ResiliencyRegistry::new(&config);
        let _held = registry.policy(KEY).unwrap().bulkhead().acquire().await.unwrap();

        let result: Result<(), _> = registry.execute(KEY, || async { Ok(()) }).await;

        let err = result.unwrap_err();
        assert_eq!(err.code().as_str(), "PR000");
        assert!(err.to_string().contains("bulkhead saturated"));
    }
}
