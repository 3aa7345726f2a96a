use crate::config::TtlConfig;
use crate::error::TokenError;
use crate::jwt::claims::{Claims, TokenType};
use crate::jwt::signer::TokenSigner;
use crate::model::ServiceUser;
use std::sync::Arc;

/// Builds claim sets for every token kind and signs them.
#[derive(Clone)]
pub struct TokenCodec {
    issuer: String,
    signer: Arc<dyn TokenSigner>,
}

impl TokenCodec {
    pub fn new(issuer: impl Into<String>, signer: Arc<dyn TokenSigner>) -> Self {
        TokenCodec {
            issuer: issuer.into(),
            signer,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Access token claims for a service user.
    pub fn build_token(&self, app: &str, id: &str, user: &ServiceUser, ttl: &TtlConfig) -> Claims {
        Claims::new(
            self.issuer.clone(),
            user.id.clone(),
            app.to_string(),
            id.to_string(),
            TokenType::Access,
            ttl.access_secs(),
        )
        .with_role(user.role.clone())
        .with_name(user.name.clone())
    }

    /// Refresh token claims tied to `base` through its `jti`.
    pub fn build_refresh_token(&self, app: &str, id: &str, ttl: &TtlConfig, base: &Claims) -> Claims {
        let mut claims = Claims::new(
            self.issuer.clone(),
            base.sub.clone(),
            app.to_string(),
            id.to_string(),
            TokenType::Refresh,
            ttl.refresh_secs(),
        )
        .with_access_token_id(base.jti.clone());
        claims.iat = base.iat;
        claims.exp = base.iat.saturating_add(ttl.refresh_secs());
        claims
    }

    /// Static token claims; the record id is the subject.
    pub fn build_static_token(&self, app: &str, id: &str, role: &str, ttl: &TtlConfig) -> Claims {
        Claims::new(
            self.issuer.clone(),
            id.to_string(),
            app.to_string(),
            id.to_string(),
            TokenType::Static,
            ttl.static_secs(),
        )
        .with_role(role.to_string())
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        self.signer.sign(claims)
    }

    pub fn signer(&self) -> &dyn TokenSigner {
        self.signer.as_ref()
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("key_id", &self.signer.key_id())
            .finish_non_exhaustive()
    }
}
