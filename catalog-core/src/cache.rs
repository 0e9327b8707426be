//! Redis-backed cache client (spec §3 "Cache entry", §4.8).
//!
//! Grounded directly on `ferrex_core::database::cache::RedisCache`: a
//! `ConnectionManager` wrapped for cheap `Clone`, JSON-serialized values,
//! `SETEX`-style TTL writes. The higher-level cache-aside pattern (decide
//! *what* to cache under *which* key) lives in `catalog-api::cache_aside`;
//! this module only knows how to get/set bytes by key.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CatalogError, Result};

/// Byte-level cache access, kept behind a trait for the same reason
/// [`crate::search::SearchIndex`] is: `catalog-api`'s cache-aside layer
/// can be unit-tested against an in-memory fake instead of a live Redis
/// instance.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// Deserializes a cached value looked up through `cache`. A free
/// function rather than a trait method so [`Cache`] stays object-safe
/// for `Arc<dyn Cache>` call sites while still offering the JSON
/// convenience `RedisCache` used to provide directly.
pub async fn get_json<C: Cache + ?Sized, T: DeserializeOwned>(cache: &C, key: &str) -> Result<Option<T>> {
    match cache.get_raw(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serializes and stores `value` under `key` with the given TTL.
pub async fn set_json<C: Cache + ?Sized, T: Serialize + Sync>(cache: &C, key: &str, value: &T, ttl: Duration) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    cache.set_raw(key, &raw, ttl).await
}

#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache").field("conn", &"ConnectionManager").finish()
    }
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|err| CatalogError::Transient(format!("invalid redis url: {err}")))?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|err| CatalogError::Transient(format!("connecting to redis: {err}")))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|err| CatalogError::Transient(format!("redis GET failed: {err}")))?;
        debug!(key, hit = value.is_some(), "cache lookup");
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|err| CatalogError::Transient(format!("redis SETEX failed: {err}")))?;
        debug!(key, ttl_secs = ttl.as_secs(), "cache write");
        Ok(())
    }
}

/// One positional argument to [`fingerprint`]. Every distinct value must
/// stringify distinctly so equal argument tuples produce equal
/// fingerprints and unequal tuples produce unequal ones (spec §4.8, §8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintPart {
    Str(String),
    Uuid(Uuid),
    Int(i64),
    Null,
}

impl FingerprintPart {
    fn stringify(&self) -> String {
        match self {
            // A bare prefix disambiguates a string that happens to look
            // like a UUID/int/null from the real thing.
            FingerprintPart::Str(s) => format!("s:{s}"),
            FingerprintPart::Uuid(u) => format!("u:{u}"),
            FingerprintPart::Int(i) => format!("i:{i}"),
            FingerprintPart::Null => "n".to_string(),
        }
    }
}

impl From<&str> for FingerprintPart {
    fn from(value: &str) -> Self {
        FingerprintPart::Str(value.to_string())
    }
}

impl From<String> for FingerprintPart {
    fn from(value: String) -> Self {
        FingerprintPart::Str(value)
    }
}

impl From<Uuid> for FingerprintPart {
    fn from(value: Uuid) -> Self {
        FingerprintPart::Uuid(value)
    }
}

impl From<i64> for FingerprintPart {
    fn from(value: i64) -> Self {
        FingerprintPart::Int(value)
    }
}

impl From<u32> for FingerprintPart {
    fn from(value: u32) -> Self {
        FingerprintPart::Int(value as i64)
    }
}

impl<T: Into<FingerprintPart>> From<Option<T>> for FingerprintPart {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => FingerprintPart::Null,
        }
    }
}

/// Deterministic, insertion-ordered concatenation of `parts` (spec
/// §4.8). Used as the Redis key for every cached query-service
/// operation.
pub fn fingerprint(parts: &[FingerprintPart]) -> String {
    parts.iter().map(FingerprintPart::stringify).collect::<Vec<_>>().join(":")
}
