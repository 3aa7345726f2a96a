//! Redis-backed keyed store.
//!
//! Each record is a Redis hash stored under `"{namespace}:{set}:{id}"`.
//! Full writes run `DEL` + `HSET` inside `MULTI`/`EXEC` so a put replaces
//! the record atomically; partial updates are a single `HSET`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, ErrorKind, RedisError};
use rust_common::PlatformError;
use tracing::debug;

use super::{Bin, KeyedStore, Record, RecordKey};

/// [`KeyedStore`] over a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the server cannot be reached.
    pub async fn connect(
        redis_url: &str,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let client = redis::Client::open(redis_url).map_err(classify)?;
        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(connect_timeout)
            .set_response_timeout(response_timeout);
        let conn = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(classify)?;

        debug!(url = %redact_url(redis_url), "connected to redis");
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    #[must_use]
    pub const fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

fn hash_fields(bins: Vec<Bin>) -> Vec<(String, String)> {
    bins.into_iter()
        .map(|bin| {
            let value = bin.value.to_text();
            (bin.name, value)
        })
        .collect()
}

#[async_trait]
impl KeyedStore for RedisStore {
    async fn get(
        &self,
        key: &RecordKey,
        fields: Option<&[&str]>,
    ) -> Result<Option<Record>, PlatformError> {
        let mut conn = self.conn.clone();
        let redis_key = key.to_string();

        match fields {
            None => {
                let map: std::collections::HashMap<String, String> =
                    conn.hgetall(&redis_key).await.map_err(classify)?;
                if map.is_empty() {
                    return Ok(None);
                }
                Ok(Some(map.into_iter().collect()))
            }
            Some(fields) if fields.is_empty() => {
                let exists: bool = conn.exists(&redis_key).await.map_err(classify)?;
                Ok(exists.then(Record::new))
            }
            Some(fields) => {
                let (exists, values): (bool, Vec<Option<String>>) = redis::pipe()
                    .atomic()
                    .exists(&redis_key)
                    .cmd("HMGET")
                    .arg(&redis_key)
                    .arg(fields)
                    .query_async(&mut conn)
                    .await
                    .map_err(classify)?;
                if !exists {
                    return Ok(None);
                }
                let record = fields
                    .iter()
                    .zip(values)
                    .filter_map(|(name, value)| value.map(|v| ((*name).to_string(), v)))
                    .collect();
                Ok(Some(record))
            }
        }
    }

    async fn put(&self, key: &RecordKey, bins: Vec<Bin>) -> Result<(), PlatformError> {
        let mut conn = self.conn.clone();
        let redis_key = key.to_string();
        let items = hash_fields(bins);

        let mut pipe = redis::pipe();
        pipe.atomic().del(&redis_key).ignore();
        if !items.is_empty() {
            pipe.hset_multiple(&redis_key, items.as_slice()).ignore();
        }
        let (): () = pipe.query_async(&mut conn).await.map_err(classify)?;
        Ok(())
    }

    async fn partial_update(&self, key: &RecordKey, bins: Vec<Bin>) -> Result<(), PlatformError> {
        let items = hash_fields(bins);
        if items.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let (): () = conn
            .hset_multiple(key.to_string(), items.as_slice())
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool, PlatformError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key.to_string()).await.map_err(classify)?;
        Ok(removed > 0)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

/// Map a Redis failure onto the platform taxonomy.
///
/// Connection-level faults and cluster/replica transitions are transient;
/// everything else (wrong type, script errors, bad replies) is permanent.
#[must_use]
pub fn classify(err: RedisError) -> PlatformError {
    if err.is_timeout() {
        return PlatformError::timeout(err.to_string());
    }
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        return PlatformError::unavailable(err.to_string());
    }
    match err.kind() {
        ErrorKind::TryAgain
        | ErrorKind::BusyLoadingError
        | ErrorKind::MasterDown
        | ErrorKind::ClusterDown => PlatformError::unavailable(err.to_string()),
        ErrorKind::TypeError => PlatformError::serialization(err.to_string()),
        ErrorKind::InvalidClientConfig => PlatformError::invalid_input(err.to_string()),
        _ => PlatformError::internal(err.to_string()),
    }
}

fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => format!("{}***{}", &url[..scheme + 3], &url[at..]),
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_classify_io_is_transient() {
        let err = RedisError::from(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(classify(err).is_transient());
    }

    #[test]
    fn test_classify_timeout() {
        let err = RedisError::from(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert!(matches!(classify(err), PlatformError::Timeout(_)));
    }

    #[test]
    fn test_classify_cluster_down_is_transient() {
        let err = RedisError::from((ErrorKind::ClusterDown, "cluster is down"));
        assert!(classify(err).is_transient());
    }

    #[test]
    fn test_classify_type_error_is_permanent() {
        let err = RedisError::from((ErrorKind::TypeError, "WRONGTYPE"));
        let mapped = classify(err);
        assert!(!mapped.is_transient());
        assert!(matches!(mapped, PlatformError::Serialization(_)));
    }

    #[test]
    fn test_classify_response_error_is_permanent() {
        let err = RedisError::from((ErrorKind::ResponseError, "ERR unknown command"));
        assert!(matches!(classify(err), PlatformError::Internal(_)));
    }

    #[test]
    fn test_hash_fields_text_form() {
        let items = hash_fields(vec![
            Bin::new("enabled", false),
            Bin::new("expires_at", 42_i64),
            Bin::new("token", "abc"),
        ]);
        assert_eq!(
            items,
            vec![
                ("enabled".to_string(), "false".to_string()),
                ("expires_at".to_string(), "42".to_string()),
                ("token".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(redact_url("redis://user:pw@host:6379"), "redis://***@host:6379");
        assert_eq!(redact_url("redis://127.0.0.1:6379"), "redis://127.0.0.1:6379");
    }
}
