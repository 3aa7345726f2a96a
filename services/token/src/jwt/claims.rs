use serde::{Deserialize, Serialize};

/// Kind of token a set of claims belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived access token of a dynamic pair
    Access,
    /// Refresh token of a dynamic pair
    Refresh,
    /// Long-lived static credential
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    // Standard JWT claims
    pub iss: String,
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,

    // Tenant binding
    pub app: String,
    pub tid: String,
    pub typ: TokenType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `jti` of the access token a refresh token was issued with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ati: Option<String>,
}

impl Claims {
    pub fn new(
        issuer: String,
        subject: String,
        app: String,
        token_id: String,
        typ: TokenType,
        ttl_seconds: i64,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            iss: issuer,
            sub: subject,
            exp: now.saturating_add(ttl_seconds),
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
            app,
            tid: token_id,
            typ,
            role: None,
            name: None,
            ati: None,
        }
    }

    pub fn with_role(mut self, role: String) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Ties a refresh token to the access token it was issued with
    pub fn with_access_token_id(mut self, jti: String) -> Self {
        self.ati = Some(jti);
        self
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }

    pub fn is_valid_at(&self, timestamp: i64) -> bool {
        timestamp >= self.iat && timestamp < self.exp
    }
}
