//! JWT signing traits and implementations.

use crate::error::TokenError;
use crate::jwt::claims::Claims;
use crate::jwt::serializer::JwtSerializer;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use zeroize::Zeroizing;

/// Turns claims into a signed compact JWT.
pub trait TokenSigner: Send + Sync {
    /// Sign the claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded or signed.
    fn sign(&self, claims: &Claims) -> Result<String, TokenError>;

    /// Get the key ID for JWT header.
    fn key_id(&self) -> &str;

    /// Get the algorithm name for JWT header.
    fn algorithm(&self) -> &str;
}

/// HMAC signer holding a shared secret.
pub struct HmacSigner {
    key_id: String,
    secret: Zeroizing<Vec<u8>>,
    serializer: JwtSerializer,
}

impl HmacSigner {
    /// Shortest accepted secret.
    pub const MIN_SECRET_LEN: usize = 32;

    /// Create an HS512 signer.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is shorter than [`Self::MIN_SECRET_LEN`].
    pub fn new(key_id: impl Into<String>, secret: Vec<u8>) -> Result<Self, TokenError> {
        let secret = Zeroizing::new(secret);
        if secret.len() < Self::MIN_SECRET_LEN {
            return Err(TokenError::config(format!(
                "JWT signing secret must be at least {} bytes, got {}",
                Self::MIN_SECRET_LEN,
                secret.len()
            )));
        }
        Ok(Self {
            key_id: key_id.into(),
            secret,
            serializer: JwtSerializer::new(Algorithm::HS512),
        })
    }

    /// Switch to another HMAC algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error for non-HMAC algorithm names.
    pub fn with_algorithm(mut self, algorithm: &str) -> Result<Self, TokenError> {
        self.serializer = JwtSerializer::new(JwtSerializer::parse_algorithm(algorithm)?);
        Ok(self)
    }

    /// Verify a token issued by this signer and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature, issuer or expiry does not check out.
    pub fn verify(&self, token: &str, issuer: &str) -> Result<Claims, TokenError> {
        self.serializer
            .deserialize(token, &DecodingKey::from_secret(&self.secret), issuer)
    }
}

impl TokenSigner for HmacSigner {
    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        self.serializer.serialize(
            claims,
            &EncodingKey::from_secret(&self.secret),
            Some(&self.key_id),
        )
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn algorithm(&self) -> &str {
        match self.serializer.algorithm() {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            _ => "HS512",
        }
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::claims::TokenType;

    fn secret() -> Vec<u8> {
        b"signer-test-secret-which-is-long-enough-for-hs512".to_vec()
    }

    fn claims() -> Claims {
        Claims::new(
            "iss".to_string(),
            "user-1".to_string(),
            "billing".to_string(),
            "svc-1".to_string(),
            TokenType::Access,
            60,
        )
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = HmacSigner::new("k", b"too-short".to_vec());
        assert!(matches!(result, Err(TokenError::Config(_))));
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = HmacSigner::new("key-1", secret()).unwrap();
        let token = signer.sign(&claims()).unwrap();

        let decoded = signer.verify(&token, "iss").unwrap();
        assert_eq!(decoded.sub, "user-1");
        assert_eq!(decoded.typ, TokenType::Access);
    }

    #[test]
    fn test_other_secret_cannot_verify() {
        let signer = HmacSigner::new("key-1", secret()).unwrap();
        let other = HmacSigner::new("key-1", vec![7u8; 64]).unwrap();
        let token = signer.sign(&claims()).unwrap();

        assert!(other.verify(&token, "iss").is_err());
    }

    #[test]
    fn test_signer_metadata() {
        let signer = HmacSigner::new("my-key", secret())
            .unwrap()
            .with_algorithm("HS384")
            .unwrap();

        assert_eq!(signer.key_id(), "my-key");
        assert_eq!(signer.algorithm(), "HS384");
        assert!(!format!("{signer:?}").contains("signer-test-secret"));
    }
}
