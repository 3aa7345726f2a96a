use tracing::info;

use super::{schema, TokenLifecycle};
use crate::config::TtlConfig;
use crate::error::TokenError;
use crate::model::{StaticToken, StaticTokenResponse, TokenDisableResponse};
use crate::resilience::{Domain, Operation, PolicyKey};

impl TokenLifecycle {
    /// Issue a static token for `id` and store it, replacing any existing
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::OperationFailed`] if signing or the store fails.
    pub async fn generate_static(
        &self,
        app: &str,
        id: &str,
        role: &str,
        ttl: &TtlConfig,
    ) -> Result<StaticTokenResponse, TokenError> {
        let key = PolicyKey::new(Domain::Static, Operation::Generate);
        self.resiliency
            .execute(key, move || async move {
                let claims = self.codec.build_static_token(app, id, role, ttl);
                let token = self.codec.sign(&claims)?;

                let bins = schema::static_bins(id, role, token.clone(), claims.iat, claims.exp);
                self.store.put(&self.static_key(app, id), bins).await?;

                info!(app = %app, id = %id, role = %role, "static token generated");
                Ok(StaticTokenResponse { token })
            })
            .await
    }

    /// Fetch a static token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::OperationFailed`] if the store fails or the
    /// record is malformed.
    pub async fn get_static(&self, app: &str, id: &str) -> Result<Option<StaticToken>, TokenError> {
        let key = PolicyKey::new(Domain::Static, Operation::Get);
        self.resiliency
            .execute(key, move || async move {
                let record = self.store.get(&self.static_key(app, id), None).await?;
                record.map(|r| schema::static_token(id, &r)).transpose()
            })
            .await
    }

    /// Disable a static token. Returns `None` if there is no record.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::OperationFailed`] if the store fails.
    pub async fn disable_static(
        &self,
        app: &str,
        id: &str,
    ) -> Result<Option<TokenDisableResponse>, TokenError> {
        let key = PolicyKey::new(Domain::Static, Operation::Disable);
        self.resiliency
            .execute(key, move || async move {
                self.disable_record(self.static_key(app, id)).await
            })
            .await
    }

    /// Disable a static token, failing if there is no record.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::NotFound`] if there is no record and
    /// [`TokenError::OperationFailed`] if the store fails.
    pub async fn disable_static_strict(
        &self,
        app: &str,
        id: &str,
    ) -> Result<TokenDisableResponse, TokenError> {
        let key = PolicyKey::new(Domain::Static, Operation::DisableStrict);
        self.resiliency
            .execute(key, move || async move {
                let record_key = self.static_key(app, id);
                let set = record_key.set().to_string();
                self.disable_record(record_key)
                    .await?
                    .ok_or_else(|| TokenError::not_found(set, id))
            })
            .await
    }
}
