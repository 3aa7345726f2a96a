//! Prometheus metrics for the token lifecycle.
//!
//! Every series is labelled with the policy pair (`domain`, `operation`) the
//! call ran under.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramTimer, HistogramVec,
};

use crate::resilience::PolicyKey;

/// Completed operations by outcome.
pub static OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_lifecycle_operations_total",
        "Total number of lifecycle operations by outcome",
        &["domain", "operation", "outcome"]
    )
    .expect("Failed to register operations metric")
});

/// Operation latency histogram, including retries.
pub static OPERATION_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "token_lifecycle_operation_latency_seconds",
        "Lifecycle operation latency in seconds",
        &["domain", "operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register operation_latency metric")
});

/// Extra attempts spent on transient failures.
pub static RETRIES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_lifecycle_retries_total",
        "Total number of retried attempts",
        &["domain", "operation"]
    )
    .expect("Failed to register retries metric")
});

/// Calls turned away before reaching the store.
pub static REJECTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_lifecycle_rejections_total",
        "Total number of calls rejected by a breaker or bulkhead",
        &["domain", "operation", "reason"]
    )
    .expect("Failed to register rejections metric")
});

/// Outcome label of a finished operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Body returned `Ok`
    Success,
    /// Strict lookup found nothing
    NotFound,
    /// Body failed after retries
    Failed,
    /// Call never ran
    Rejected,
}

impl Outcome {
    /// Label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }
}

/// Record a finished operation.
pub fn record_operation(key: PolicyKey, outcome: Outcome) {
    OPERATIONS
        .with_label_values(&[key.domain.as_str(), key.operation.as_str(), outcome.as_str()])
        .inc();
}

/// Start a latency timer that observes on drop.
#[must_use]
pub fn start_timer(key: PolicyKey) -> HistogramTimer {
    OPERATION_LATENCY
        .with_label_values(&[key.domain.as_str(), key.operation.as_str()])
        .start_timer()
}

/// Record extra attempts.
pub fn record_retries(key: PolicyKey, retries: u32) {
    if retries == 0 {
        return;
    }
    RETRIES
        .with_label_values(&[key.domain.as_str(), key.operation.as_str()])
        .inc_by(f64::from(retries));
}

/// Record a rejected call.
pub fn record_rejection(key: PolicyKey, reason: &str) {
    REJECTIONS
        .with_label_values(&[key.domain.as_str(), key.operation.as_str(), reason])
        .inc();
}
