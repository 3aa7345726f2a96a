//! Token lifecycle library.
//!
//! Issues, stores, rotates and revokes signed bearer tokens for multiple
//! tenant applications. Each tenant owns a set of rotating dynamic token
//! pairs and a set of long-lived static tokens. Every operation runs under a
//! per-operation retry, circuit breaker and bulkhead policy and fails with
//! one of two stable error codes (`PR000`, `PR001`).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod jwt;
pub mod lifecycle;
pub mod metrics;
pub mod model;
pub mod resilience;
pub mod storage;

// Re-exports for convenience
pub use config::{Config, TtlConfig};
pub use error::{ErrorCode, TokenError};
pub use lifecycle::TokenLifecycle;
pub use model::{
    DynamicToken, RefreshResponse, ServiceUser, StaticToken, StaticTokenResponse,
    TokenClearResponse, TokenDisableResponse, TokenExpireResponse, TokenResponse,
};
pub use resilience::{Domain, Operation, PolicyKey, ResiliencyConfig, ResiliencyRegistry};
pub use storage::{KeyedStore, MemoryStore, RedisStore};
