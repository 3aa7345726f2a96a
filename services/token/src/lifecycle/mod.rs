//! Token lifecycle operations.
//!
//! [`TokenLifecycle`] is the entry point an HTTP layer calls. Every operation
//! body runs as a closure under [`ResiliencyRegistry::execute`] with its own
//! [`PolicyKey`](crate::resilience::PolicyKey), so each attempt rebuilds the
//! record key, re-signs and re-issues the store calls.
//!
//! Not-found handling is deliberately asymmetric: the `*_strict` disable
//! variants fail with [`TokenError::NotFound`], every other operation returns
//! `Ok(None)` for a missing record.

mod dynamic;
pub mod schema;
mod static_tokens;

use std::sync::Arc;

use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::error::TokenError;
use crate::jwt::{HmacSigner, TokenCodec};
use crate::resilience::ResiliencyRegistry;
use crate::storage::{KeyedStore, MemoryStore, RecordKey, RedisStore};

/// Issues, rotates and revokes tenant tokens.
pub struct TokenLifecycle {
    store: Arc<dyn KeyedStore>,
    codec: TokenCodec,
    resiliency: ResiliencyRegistry,
    namespace: String,
}

impl TokenLifecycle {
    /// Assemble a lifecycle from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyedStore>,
        codec: TokenCodec,
        resiliency: ResiliencyRegistry,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            codec,
            resiliency,
            namespace: namespace.into(),
        }
    }

    /// Build the store, signer and policies described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is unusable or the store
    /// cannot be reached.
    pub async fn from_config(config: &Config) -> Result<Self, TokenError> {
        let store: Arc<dyn KeyedStore> = match &config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Redis { url } => Arc::new(
                RedisStore::connect(
                    url,
                    config.store.connect_timeout,
                    config.store.response_timeout,
                )
                .await?,
            ),
        };
        let signer = HmacSigner::new(
            config.jwt.key_id.clone(),
            config.jwt.signing_secret.to_vec(),
        )?;
        let codec = TokenCodec::new(config.jwt.issuer.clone(), Arc::new(signer));

        info!(
            namespace = %config.store.namespace,
            backend = ?config.store.backend,
            issuer = %config.jwt.issuer,
            "token lifecycle initialized"
        );

        Ok(Self::new(
            store,
            codec,
            ResiliencyRegistry::new(&config.resiliency),
            config.store.namespace.clone(),
        ))
    }

    /// Policies the operations run under.
    #[must_use]
    pub const fn resiliency(&self) -> &ResiliencyRegistry {
        &self.resiliency
    }

    /// Codec used to issue tokens.
    #[must_use]
    pub const fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn dynamic_key(&self, app: &str, id: &str) -> RecordKey {
        RecordKey::new(&self.namespace, schema::dynamic_set(app), id)
    }

    fn static_key(&self, app: &str, id: &str) -> RecordKey {
        RecordKey::new(&self.namespace, schema::static_set(app), id)
    }
}

impl std::fmt::Debug for TokenLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLifecycle")
            .field("namespace", &self.namespace)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
