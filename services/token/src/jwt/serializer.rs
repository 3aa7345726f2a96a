use crate::error::TokenError;
use crate::jwt::claims::Claims;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

pub struct JwtSerializer {
    algorithm: Algorithm,
}

impl JwtSerializer {
    pub const fn new(algorithm: Algorithm) -> Self {
        JwtSerializer { algorithm }
    }

    /// Parses an HMAC algorithm name.
    pub fn parse_algorithm(name: &str) -> Result<Algorithm, TokenError> {
        match name.to_uppercase().as_str() {
            "HS256" => Ok(Algorithm::HS256),
            "HS384" => Ok(Algorithm::HS384),
            "HS512" => Ok(Algorithm::HS512),
            _ => Err(TokenError::config(format!("Unsupported JWT algorithm: {name}"))),
        }
    }

    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn serialize(&self, claims: &Claims, key: &EncodingKey, key_id: Option<&str>) -> Result<String, TokenError> {
        let mut header = Header::new(self.algorithm);
        if let Some(kid) = key_id {
            header.kid = Some(kid.to_string());
        }

        Ok(encode(&header, claims, key)?)
    }

    pub fn deserialize(&self, token: &str, key: &DecodingKey, issuer: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let token_data = decode::<Claims>(token, key, &validation)?;

        Ok(token_data.claims)
    }

    pub fn deserialize_unverified(&self, token: &str) -> Result<Claims, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(TokenError::signing("Invalid token format"));
        }

        let payload = base64::Engine::decode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            parts[1],
        )
        .map_err(|e| TokenError::signing(e.to_string()))?;

        serde_json::from_slice(&payload).map_err(|e| TokenError::signing(e.to_string()))
    }
}
