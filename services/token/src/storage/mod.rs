//! Keyed record storage.
//!
//! Token records live in a store addressed by `(namespace, set, id)`. The
//! [`KeyedStore`] trait is the only seam the lifecycle layer talks to; it is
//! implemented by [`MemoryStore`] for tests and development and by
//! [`RedisStore`] for deployments.
//!
//! Adapters map backend failures into [`PlatformError`] so that only
//! transient infrastructure faults (`Unavailable`, `Timeout`) are retried.

pub mod memory;
pub mod record;
pub mod redis;

use async_trait::async_trait;
use rust_common::PlatformError;

pub use self::memory::MemoryStore;
pub use self::record::{Bin, BinValue, Record, RecordKey};
pub use self::redis::RedisStore;

/// Keyed record store.
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Read a record, optionally projected onto a subset of fields.
    ///
    /// Returns `Ok(None)` when the record does not exist.
    async fn get(
        &self,
        key: &RecordKey,
        fields: Option<&[&str]>,
    ) -> Result<Option<Record>, PlatformError>;

    /// Create or fully replace a record.
    async fn put(&self, key: &RecordKey, bins: Vec<Bin>) -> Result<(), PlatformError>;

    /// Atomically update the given fields, leaving the others untouched.
    ///
    /// A missing record is created with only the given fields.
    async fn partial_update(&self, key: &RecordKey, bins: Vec<Bin>) -> Result<(), PlatformError>;

    /// Remove a record. Returns whether it existed.
    async fn delete(&self, key: &RecordKey) -> Result<bool, PlatformError>;
}
