//! Shared library for cross-cutting concerns in auth-platform Rust services.
//!
//! This crate provides:
//! - Error types with transient/permanent classification
//! - Bounded retry with pluggable backoff
//! - Rolling-window circuit breaker
//! - `tracing` subscriber setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit_breaker;
pub mod error;
pub mod retry;
pub mod tracing_config;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, HealthSnapshot};
pub use error::{PlatformError, Retryable};
pub use retry::{Backoff, RetryConfig, RetryPolicy};
pub use tracing_config::{init_tracing, TracingConfig};
