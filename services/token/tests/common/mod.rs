//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rust_common::{CircuitBreakerConfig, PlatformError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use token_lifecycle::jwt::{HmacSigner, TokenCodec};
use token_lifecycle::storage::{Bin, KeyedStore, Record, RecordKey};
use token_lifecycle::{
    MemoryStore, ResiliencyConfig, ResiliencyRegistry, ServiceUser, TokenLifecycle, TtlConfig,
};

pub const NAMESPACE: &str = "test";
pub const ISSUER: &str = "test-issuer";

/// Failure a [`FaultyStore`] injects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Connection refused, retried
    Transient,
    /// Backend rejected the command, not retried
    Permanent,
}

/// Store wrapper that counts calls and fails on demand.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    fault: Mutex<Option<Fault>>,
    remaining: AtomicU32,
    calls: AtomicU32,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call until healed.
    pub fn fail_with(&self, fault: Fault) {
        self.fail_times(u32::MAX, fault);
    }

    /// Fail the next `times` calls.
    pub fn fail_times(&self, times: u32, fault: Fault) {
        *self.fault.lock().unwrap() = Some(fault);
        self.remaining.store(times, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        *self.fault.lock().unwrap() = None;
        self.remaining.store(0, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self) -> Result<(), PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fault = *self.fault.lock().unwrap();
        let Some(fault) = fault else {
            return Ok(());
        };
        let left = self.remaining.load(Ordering::SeqCst);
        if left == 0 {
            return Ok(());
        }
        if left != u32::MAX {
            self.remaining.store(left - 1, Ordering::SeqCst);
        }
        match fault {
            Fault::Transient => Err(PlatformError::unavailable("connection refused")),
            Fault::Permanent => Err(PlatformError::internal("WRONGTYPE")),
        }
    }
}

#[async_trait]
impl KeyedStore for FaultyStore {
    async fn get(
        &self,
        key: &RecordKey,
        fields: Option<&[&str]>,
    ) -> Result<Option<Record>, PlatformError> {
        self.check()?;
        self.inner.get(key, fields).await
    }

    async fn put(&self, key: &RecordKey, bins: Vec<Bin>) -> Result<(), PlatformError> {
        self.check()?;
        self.inner.put(key, bins).await
    }

    async fn partial_update(&self, key: &RecordKey, bins: Vec<Bin>) -> Result<(), PlatformError> {
        self.check()?;
        self.inner.partial_update(key, bins).await
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, PlatformError> {
        self.check()?;
        self.inner.delete(key).await
    }
}

pub fn signer() -> Arc<HmacSigner> {
    Arc::new(HmacSigner::new("test-key", b"integration-test-secret-that-is-long-enough!".to_vec()).unwrap())
}

pub fn lifecycle(store: Arc<dyn KeyedStore>) -> TokenLifecycle {
    lifecycle_with(store, &ResiliencyConfig::default())
}

pub fn lifecycle_with(store: Arc<dyn KeyedStore>, config: &ResiliencyConfig) -> TokenLifecycle {
    TokenLifecycle::new(
        store,
        TokenCodec::new(ISSUER, signer()),
        ResiliencyRegistry::new(config),
        NAMESPACE,
    )
}

/// Breaker that trips after `volume` consecutive failures.
pub fn tripping_config(volume: u32, sleep: Duration) -> ResiliencyConfig {
    ResiliencyConfig {
        breaker: CircuitBreakerConfig::default()
            .with_request_volume_threshold(volume)
            .with_sleep_window(sleep),
        ..ResiliencyConfig::default()
    }
}

pub fn ttl() -> TtlConfig {
    TtlConfig::from_secs(3600, 86_400, 31_536_000)
}

pub fn user() -> ServiceUser {
    ServiceUser::new("u1", "admin", "A")
}

pub fn dynamic_key(app: &str, id: &str) -> RecordKey {
    RecordKey::new(NAMESPACE, format!("{app}_tokens"), id)
}

pub fn static_key(app: &str, id: &str) -> RecordKey {
    RecordKey::new(NAMESPACE, format!("{app}_static_tokens"), id)
}
