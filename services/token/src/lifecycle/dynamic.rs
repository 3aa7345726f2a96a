use chrono::Utc;
use tracing::info;

use super::{schema, TokenLifecycle};
use crate::config::TtlConfig;
use crate::error::TokenError;
use crate::model::{
    DynamicToken, RefreshResponse, ServiceUser, TokenClearResponse, TokenDisableResponse,
    TokenExpireResponse, TokenResponse,
};
use crate::resilience::{Domain, Operation, PolicyKey};
use crate::storage::RecordKey;

/// How far back a forced expiry is dated.
const EXPIRE_BACKDATE_SECS: i64 = 86_400;

impl TokenLifecycle {
    /// Issue a new access/refresh pair and store it, replacing any existing
    /// record for the id.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::OperationFailed`] if signing or the store fails.
    pub async fn generate_dynamic(
        &self,
        app: &str,
        id: &str,
        user: &ServiceUser,
        ttl: &TtlConfig,
    ) -> Result<TokenResponse, TokenError> {
        let key = PolicyKey::new(Domain::Dynamic, Operation::Generate);
        self.resiliency
            .execute(key, move || async move {
                let claims = self.codec.build_token(app, id, user, ttl);
                let token = self.codec.sign(&claims)?;
                let refresh_claims = self.codec.build_refresh_token(app, id, ttl, &claims);
                let refresh_token = self.codec.sign(&refresh_claims)?;

                let bins = schema::dynamic_bins(
                    user,
                    token.clone(),
                    refresh_token.clone(),
                    claims.iat,
                    claims.exp,
                );
                self.store.put(&self.dynamic_key(app, id), bins).await?;

                info!(app = %app, id = %id, subject = %user.id, "dynamic token generated");
                Ok(TokenResponse {
                    token,
                    refresh_token,
                    expires_at: claims.exp,
                })
            })
            .await
    }

    /// Fetch the stored pair, including the previous generation.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::OperationFailed`] if the store fails or the
    /// record is malformed.
    pub async fn get_dynamic(&self, app: &str, id: &str) -> Result<Option<DynamicToken>, TokenError> {
        let key = PolicyKey::new(Domain::Dynamic, Operation::Get);
        self.resiliency
            .execute(key, move || async move {
                let record = self.store.get(&self.dynamic_key(app, id), None).await?;
                record.map(|r| schema::dynamic_token(id, &r)).transpose()
            })
            .await
    }

    /// Rotate the pair. The identity is carried over from `current`, and
    /// `current`'s tokens become the previous generation.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::OperationFailed`] if signing or the store fails.
    pub async fn refresh_dynamic(
        &self,
        app: &str,
        id: &str,
        current: &DynamicToken,
        ttl: &TtlConfig,
    ) -> Result<RefreshResponse, TokenError> {
        let key = PolicyKey::new(Domain::Dynamic, Operation::Refresh);
        self.resiliency
            .execute(key, move || async move {
                let user = current.service_user();
                let claims = self.codec.build_token(app, id, &user, ttl);
                let token = self.codec.sign(&claims)?;
                let refresh_claims = self.codec.build_refresh_token(app, id, ttl, &claims);
                let refresh_token = self.codec.sign(&refresh_claims)?;

                let bins = schema::refresh_bins(
                    current,
                    token.clone(),
                    refresh_token.clone(),
                    claims.iat,
                    claims.exp,
                );
                self.store
                    .partial_update(&self.dynamic_key(app, id), bins)
                    .await?;

                info!(app = %app, id = %id, "dynamic token rotated");
                Ok(RefreshResponse {
                    token,
                    refresh_token,
                    expires_at: claims.exp,
                })
            })
            .await
    }

    /// Disable the pair. Returns `None` if there is no record.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::OperationFailed`] if the store fails.
    pub async fn disable_dynamic(
        &self,
        app: &str,
        id: &str,
    ) -> Result<Option<TokenDisableResponse>, TokenError> {
        let key = PolicyKey::new(Domain::Dynamic, Operation::Disable);
        self.resiliency
            .execute(key, move || async move {
                self.disable_record(self.dynamic_key(app, id)).await
            })
            .await
    }

    /// Disable the pair, failing if there is no record.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::NotFound`] if there is no record and
    /// [`TokenError::OperationFailed`] if the store fails.
    pub async fn disable_dynamic_strict(
        &self,
        app: &str,
        id: &str,
    ) -> Result<TokenDisableResponse, TokenError> {
        let key = PolicyKey::new(Domain::Dynamic, Operation::DisableStrict);
        self.resiliency
            .execute(key, move || async move {
                let record_key = self.dynamic_key(app, id);
                let set = record_key.set().to_string();
                self.disable_record(record_key)
                    .await?
                    .ok_or_else(|| TokenError::not_found(set, id))
            })
            .await
    }

    /// Back-date the access expiry by one day without disabling or deleting
    /// the record. Returns `None` if there is no record.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::OperationFailed`] if the store fails.
    pub async fn expire_dynamic(
        &self,
        app: &str,
        id: &str,
    ) -> Result<Option<TokenExpireResponse>, TokenError> {
        let key = PolicyKey::new(Domain::Dynamic, Operation::Expire);
        self.resiliency
            .execute(key, move || async move {
                let record_key = self.dynamic_key(app, id);
                let Some(record) = self
                    .store
                    .get(&record_key, Some(&schema::EXPIRE_FIELDS[..]))
                    .await?
                else {
                    return Ok(None);
                };
                let token = schema::required_str(&record, id, schema::TOKEN)?;
                let user_id = schema::required_str(&record, id, schema::SUBJECT)?;

                let expiry = Utc::now().timestamp() - EXPIRE_BACKDATE_SECS;
                self.store
                    .partial_update(&record_key, schema::expire_bins(expiry))
                    .await?;

                info!(app = %app, id = %id, expiry, "dynamic token expired");
                Ok(Some(TokenExpireResponse {
                    token,
                    user_id,
                    expiry,
                }))
            })
            .await
    }

    /// Delete the record. Returns `None` if nothing was removed.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::OperationFailed`] if the store fails.
    pub async fn clear_dynamic(
        &self,
        app: &str,
        id: &str,
    ) -> Result<Option<TokenClearResponse>, TokenError> {
        let key = PolicyKey::new(Domain::Dynamic, Operation::Clear);
        self.resiliency
            .execute(key, move || async move {
                if !self.store.delete(&self.dynamic_key(app, id)).await? {
                    return Ok(None);
                }
                info!(app = %app, id = %id, "dynamic token cleared");
                Ok(Some(TokenClearResponse {
                    user_id: id.to_string(),
                }))
            })
            .await
    }

    /// Shared disable body: read token and subject, then flip `enabled`.
    pub(super) async fn disable_record(
        &self,
        record_key: RecordKey,
    ) -> Result<Option<TokenDisableResponse>, TokenError> {
        let Some(record) = self
            .store
            .get(&record_key, Some(&schema::DISABLE_FIELDS[..]))
            .await?
        else {
            return Ok(None);
        };
        let token = schema::required_str(&record, record_key.id(), schema::TOKEN)?;
        let user_id = schema::required_str(&record, record_key.id(), schema::SUBJECT)?;

        self.store
            .partial_update(&record_key, schema::disable_bins())
            .await?;

        info!(key = %record_key, "token disabled");
        Ok(Some(TokenDisableResponse { token, user_id }))
    }
}
