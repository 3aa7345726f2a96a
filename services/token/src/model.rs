//! Token records and operation responses.
//!
//! Responses serialize with camelCase field names, which is the shape the
//! HTTP layer returns to tenants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity a dynamic token pair is issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUser {
    /// Subject claim
    pub id: String,
    /// Role claim
    pub role: String,
    /// Display name claim
    pub name: String,
}

impl ServiceUser {
    /// Create a service user.
    #[must_use]
    pub fn new(id: impl Into<String>, role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            name: name.into(),
        }
    }
}

/// Which generation of a rotating pair a presented token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// Issued by the latest generate or refresh
    Current,
    /// Superseded by the latest refresh, still inside the grace window
    Previous,
}

/// Stored state of a dynamic (rotating) token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicToken {
    /// Record id
    pub id: String,
    /// Subject the pair was issued for
    pub subject: String,
    /// Role of the subject
    pub role: String,
    /// Display name of the subject
    pub name: String,
    /// Current access token
    pub token: String,
    /// Current refresh token
    pub refresh_token: String,
    /// Access token replaced by the latest refresh
    pub previous_token: Option<String>,
    /// Refresh token replaced by the latest refresh
    pub previous_refresh_token: Option<String>,
    /// Issue time of the current generation
    pub issued_at: DateTime<Utc>,
    /// Expiry of the current access token
    pub expires_at: DateTime<Utc>,
    /// Whether the pair may still be used
    pub enabled: bool,
}

impl DynamicToken {
    /// Identity the pair was issued for.
    #[must_use]
    pub fn service_user(&self) -> ServiceUser {
        ServiceUser::new(&self.subject, &self.role, &self.name)
    }

    /// Whether the current access token is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Generation the presented access token belongs to, if any.
    #[must_use]
    pub fn access_generation(&self, token: &str) -> Option<Generation> {
        if self.token == token {
            Some(Generation::Current)
        } else if self.previous_token.as_deref() == Some(token) {
            Some(Generation::Previous)
        } else {
            None
        }
    }

    /// Generation the presented refresh token belongs to, if any.
    #[must_use]
    pub fn refresh_generation(&self, token: &str) -> Option<Generation> {
        if self.refresh_token == token {
            Some(Generation::Current)
        } else if self.previous_refresh_token.as_deref() == Some(token) {
            Some(Generation::Previous)
        } else {
            None
        }
    }
}

/// Stored state of a static token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticToken {
    /// Record id
    pub id: String,
    /// Subject of the token
    pub subject: String,
    /// Role of the subject
    pub role: String,
    /// The token
    pub token: String,
    /// Issue time
    pub issued_at: DateTime<Utc>,
    /// Expiry
    pub expires_at: DateTime<Utc>,
    /// Whether the token may still be used
    pub enabled: bool,
}

/// Result of generating a dynamic pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Access token
    pub token: String,
    /// Refresh token
    pub refresh_token: String,
    /// Access token expiry, epoch seconds
    pub expires_at: i64,
}

/// Result of rotating a dynamic pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// New access token
    pub token: String,
    /// New refresh token
    pub refresh_token: String,
    /// New access token expiry, epoch seconds
    pub expires_at: i64,
}

/// Result of generating a static token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticTokenResponse {
    /// The token
    pub token: String,
}

/// Result of disabling a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDisableResponse {
    /// Token that was disabled
    pub token: String,
    /// Subject of the disabled token
    pub user_id: String,
}

/// Result of force-expiring a dynamic pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExpireResponse {
    /// Token that was expired
    pub token: String,
    /// Subject of the expired token
    pub user_id: String,
    /// Expiry that was written, epoch seconds
    pub expiry: i64,
}

/// Result of removing a dynamic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClearResponse {
    /// Id of the removed record
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> DynamicToken {
        let now = Utc::now();
        DynamicToken {
            id: "svc-1".to_string(),
            subject: "user-1".to_string(),
            role: "admin".to_string(),
            name: "Bot".to_string(),
            token: "t2".to_string(),
            refresh_token: "r2".to_string(),
            previous_token: Some("t1".to_string()),
            previous_refresh_token: Some("r1".to_string()),
            issued_at: now,
            expires_at: now + chrono::Duration::hours(1),
            enabled: true,
        }
    }

    #[test]
    fn test_generations() {
        let token = pair();
        assert_eq!(token.access_generation("t2"), Some(Generation::Current));
        assert_eq!(token.access_generation("t1"), Some(Generation::Previous));
        assert_eq!(token.access_generation("t0"), None);
        assert_eq!(token.refresh_generation("r1"), Some(Generation::Previous));
    }

    #[test]
    fn test_expiry() {
        let token = pair();
        assert!(!token.is_expired_at(Utc::now()));
        assert!(token.is_expired_at(token.expires_at));
    }

    #[test]
    fn test_response_field_names() {
        let json = serde_json::to_value(TokenResponse {
            token: "t".to_string(),
            refresh_token: "r".to_string(),
            expires_at: 10,
        })
        .unwrap();
        assert_eq!(json["refreshToken"], "r");
        assert_eq!(json["expiresAt"], 10);

        let json = serde_json::to_value(TokenDisableResponse {
            token: "t".to_string(),
            user_id: "u".to_string(),
        })
        .unwrap();
        assert_eq!(json["userId"], "u");
    }
}
