//! Centralized configuration for the token lifecycle service.
//!
//! All configuration is loaded from environment variables (a `.env` file is
//! honoured) and validated at startup. Platform library configurations are
//! included.

use crate::error::TokenError;
use crate::resilience::{BulkheadConfig, ResiliencyConfig, SaturationPolicy};
use rust_common::{CircuitBreakerConfig, RetryConfig, TracingConfig};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use zeroize::Zeroizing;

/// Record store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store
    Memory,
    /// Redis server
    Redis {
        /// Connection URL
        url: String,
    },
}

/// Record store settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend selection
    pub backend: StoreBackend,
    /// Namespace prefix for every record key
    pub namespace: String,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// Per-command response timeout
    pub response_timeout: Duration,
}

/// JWT signing settings.
#[derive(Clone)]
pub struct JwtConfig {
    /// `iss` claim
    pub issuer: String,
    /// `kid` header
    pub key_id: String,
    /// HMAC secret
    pub signing_secret: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("key_id", &self.key_id)
            .field("signing_secret", &"<redacted>")
            .finish()
    }
}

/// Lifetimes of the tokens issued for one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlConfig {
    /// Access token lifetime
    pub access: Duration,
    /// Refresh token lifetime
    pub refresh: Duration,
    /// Static token lifetime
    pub static_token: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            access: Duration::from_secs(3600),
            refresh: Duration::from_secs(86_400),
            static_token: Duration::from_secs(31_536_000),
        }
    }
}

impl TtlConfig {
    /// Create a TTL set from seconds.
    #[must_use]
    pub const fn from_secs(access: u64, refresh: u64, static_token: u64) -> Self {
        Self {
            access: Duration::from_secs(access),
            refresh: Duration::from_secs(refresh),
            static_token: Duration::from_secs(static_token),
        }
    }

    /// Access lifetime in whole seconds.
    #[must_use]
    pub fn access_secs(&self) -> i64 {
        duration_secs(self.access)
    }

    /// Refresh lifetime in whole seconds.
    #[must_use]
    pub fn refresh_secs(&self) -> i64 {
        duration_secs(self.refresh)
    }

    /// Static lifetime in whole seconds.
    #[must_use]
    pub fn static_secs(&self) -> i64 {
        duration_secs(self.static_token)
    }
}

fn duration_secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

/// Default TTLs plus per-tenant overrides.
#[derive(Debug, Clone, Default)]
pub struct TokenTtls {
    /// Used for tenants without an override
    pub default: TtlConfig,
    /// Per-tenant TTLs
    pub overrides: HashMap<String, TtlConfig>,
}

impl TokenTtls {
    /// TTLs for a tenant.
    #[must_use]
    pub fn for_app(&self, app: &str) -> &TtlConfig {
        self.overrides.get(app).unwrap_or(&self.default)
    }
}

/// Token lifecycle configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Record store
    pub store: StoreConfig,
    /// JWT signing
    pub jwt: JwtConfig,
    /// Token lifetimes
    pub ttl: TokenTtls,
    /// Default resiliency settings for every policy
    pub resiliency: ResiliencyConfig,
    /// Logging
    pub tracing: TracingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = StoreConfig {
            backend: match var(&lookup, "STORE_BACKEND", "memory").to_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "redis" => StoreBackend::Redis {
                    url: var(&lookup, "REDIS_URL", "redis://127.0.0.1:6379"),
                },
                other => {
                    return Err(TokenError::config(format!("Invalid STORE_BACKEND: {other}")));
                }
            },
            namespace: var(&lookup, "STORE_NAMESPACE", "primer"),
            connect_timeout: Duration::from_millis(parse(&lookup, "STORE_CONNECT_TIMEOUT_MS", 1000)?),
            response_timeout: Duration::from_millis(parse(&lookup, "STORE_RESPONSE_TIMEOUT_MS", 500)?),
        };

        let jwt = JwtConfig {
            issuer: var(&lookup, "JWT_ISSUER", "token-lifecycle"),
            key_id: var(&lookup, "JWT_KEY_ID", "default"),
            signing_secret: parse_signing_secret(lookup("JWT_SIGNING_SECRET"))?,
        };

        let default_ttl = TtlConfig::from_secs(
            parse(&lookup, "ACCESS_TOKEN_TTL", 3600)?,
            parse(&lookup, "REFRESH_TOKEN_TTL", 86_400)?,
            parse(&lookup, "STATIC_TOKEN_TTL", 31_536_000)?,
        );
        let ttl = TokenTtls {
            default: default_ttl,
            overrides: parse_ttl_overrides(&lookup("TOKEN_TTL_OVERRIDES").unwrap_or_default())?,
        };

        let saturation = if parse(&lookup, "BULKHEAD_REJECT_WHEN_FULL", false)? {
            SaturationPolicy::Reject
        } else {
            SaturationPolicy::Queue
        };
        let resiliency = ResiliencyConfig {
            retry: RetryConfig::default().with_max_attempts(parse(&lookup, "RETRY_MAX_ATTEMPTS", 3)?),
            breaker: CircuitBreakerConfig::default()
                .with_request_volume_threshold(parse(&lookup, "CB_REQUEST_VOLUME_THRESHOLD", 20)?)
                .with_error_threshold_percentage(parse(&lookup, "CB_ERROR_THRESHOLD_PERCENT", 50)?)
                .with_sleep_window(Duration::from_millis(parse(&lookup, "CB_SLEEP_WINDOW_MS", 5000)?))
                .with_rolling_window(Duration::from_millis(parse(
                    &lookup,
                    "CB_ROLLING_WINDOW_MS",
                    10_000,
                )?)),
            bulkhead: BulkheadConfig::default()
                .with_max_concurrent(parse(&lookup, "BULKHEAD_MAX_CONCURRENT", 10)?)
                .with_saturation(saturation),
        };

        let mut tracing = TracingConfig::default()
            .with_service_name("token-lifecycle")
            .with_log_level(var(&lookup, "LOG_LEVEL", "info"));
        if parse(&lookup, "LOG_JSON", false)? {
            tracing = tracing.with_json_output();
        }

        Ok(Self {
            store,
            jwt,
            ttl,
            resiliency,
            tracing,
        })
    }
}

fn var<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default: &str) -> String {
    lookup(name).unwrap_or_else(|| default.to_string())
}

/// Parse variable with default value.
fn parse<F, T>(lookup: &F, name: &str, default: T) -> Result<T, TokenError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}

/// Parse the base64 signing secret, or generate one for development.
fn parse_signing_secret(value: Option<String>) -> Result<Zeroizing<Vec<u8>>, TokenError> {
    match value {
        Some(encoded) => {
            let bytes = Zeroizing::new(
                base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded.trim())
                    .map_err(|e| TokenError::config(format!("Invalid JWT_SIGNING_SECRET: {e}")))?,
            );

            if bytes.len() < 32 {
                return Err(TokenError::config(format!(
                    "JWT_SIGNING_SECRET must be at least 32 bytes, got {}",
                    bytes.len()
                )));
            }
            Ok(bytes)
        }
        None => {
            use rand::RngCore;
            tracing::warn!("JWT_SIGNING_SECRET not set, using a random development secret");
            let mut key = Zeroizing::new(vec![0u8; 64]);
            rand::thread_rng().fill_bytes(key.as_mut_slice());
            Ok(key)
        }
    }
}

/// Parse `app=access:refresh:static` entries separated by commas.
fn parse_ttl_overrides(raw: &str) -> Result<HashMap<String, TtlConfig>, TokenError> {
    let mut overrides = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = || TokenError::config(format!("Invalid TOKEN_TTL_OVERRIDES entry: {entry}"));

        let (app, ttls) = entry.split_once('=').ok_or_else(invalid)?;
        let secs = ttls
            .split(':')
            .map(|part| part.trim().parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        let &[access, refresh, static_token] = secs.as_slice() else {
            return Err(invalid());
        };
        let app = app.trim();
        if app.is_empty() {
            return Err(invalid());
        }
        overrides.insert(app.to_string(), TtlConfig::from_secs(access, refresh, static_token));
    }
    Ok(overrides)
}
