//! In-memory keyed store.
//!
//! [`MemoryStore`] is cheaply cloneable; all clones share the same records.
//! Data is not persisted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_common::PlatformError;
use tokio::sync::RwLock;

use super::{Bin, KeyedStore, Record, RecordKey};

/// In-memory [`KeyedStore`] backed by a hash map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<RecordKey, Record>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl KeyedStore for MemoryStore {
    async fn get(
        &self,
        key: &RecordKey,
        fields: Option<&[&str]>,
    ) -> Result<Option<Record>, PlatformError> {
        let records = self.records.read().await;
        Ok(records.get(key).map(|record| match fields {
            Some(fields) => record.project(fields),
            None => record.clone(),
        }))
    }

    async fn put(&self, key: &RecordKey, bins: Vec<Bin>) -> Result<(), PlatformError> {
        let record: Record = bins.into_iter().collect();
        self.records.write().await.insert(key.clone(), record);
        Ok(())
    }

    async fn partial_update(&self, key: &RecordKey, bins: Vec<Bin>) -> Result<(), PlatformError> {
        self.records
            .write()
            .await
            .entry(key.clone())
            .or_default()
            .merge(bins);
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, PlatformError> {
        Ok(self.records.write().await.remove(key).is_some())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}
