//! Cache-aside service (spec §4.8).
//!
//! Grounded on `catalog_core::cache`'s `Cache` trait + `fingerprint`
//! function plus `catalog_core::search::SearchIndex`: this module is the
//! composition-over-inheritance collaborator spec §9 calls for in place
//! of the original's `BaseService` class — a single `CacheAside` struct
//! injected into each concrete query service, rather than a shared base
//! class they all extend.
//!
//! Cache failures never propagate to the caller (spec §4.8): a failed
//! `get` is treated as a miss, a failed `put` is logged and swallowed.

use std::sync::Arc;
use std::time::Duration;

use catalog_core::cache::{fingerprint, Cache, FingerprintPart};
use catalog_core::error::Result;
use catalog_core::search::SearchIndex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct CacheAside {
    cache: Arc<dyn Cache>,
    index: Arc<dyn SearchIndex>,
    ttl: Duration,
}

impl CacheAside {
    pub fn new(cache: Arc<dyn Cache>, index: Arc<dyn SearchIndex>, ttl: Duration) -> Self {
        Self { cache, index, ttl }
    }

    /// Deterministic, insertion-ordered fingerprint of `parts` (spec §4.8).
    pub fn fingerprint(&self, parts: &[FingerprintPart]) -> String {
        fingerprint(parts)
    }

    /// Reads and deserializes a cached value. A cache error is treated
    /// as a miss, not propagated, since the caller always has the
    /// search index as a fallback.
    pub async fn get_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get_raw(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    Some(value)
                }
                Err(err) => {
                    warn!(key, %err, "cached value failed to deserialize, treating as miss");
                    None
                }
            },
            Ok(None) => {
                debug!(key, "cache miss");
                None
            }
            Err(err) => {
                warn!(key, %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Serializes and stores `value` under `key` with the service's
    /// configured TTL. Never blocks the caller on failure (spec §4.8).
    pub async fn put_cached<T: Serialize + Sync>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, %err, "failed to serialize value for caching");
                return;
            }
        };
        if let Err(err) = self.cache.set_raw(key, &raw, self.ttl).await {
            warn!(key, %err, "cache write failed, continuing without caching");
        }
    }

    /// Fetches one document by id from `index` and deserializes it.
    /// `Ok(None)` is the "absent" sentinel (spec §7's not-found taxonomy
    /// entry); any other error propagates since it represents a real
    /// backend failure, not a cacheable miss.
    pub async fn get_from_index<T: DeserializeOwned>(&self, index: &str, id: &str) -> Result<Option<T>> {
        match self.index.get_document(index, id).await? {
            Some(source) => Ok(Some(serde_json::from_value(source)?)),
            None => Ok(None),
        }
    }

    /// Runs a query against `index` and deserializes every hit.
    pub async fn search_index<T: DeserializeOwned>(&self, index: &str, body: Value) -> Result<Vec<T>> {
        let hits = self.index.search(index, body).await?;
        hits.into_iter().map(|hit| Ok(serde_json::from_value(hit)?)).collect()
    }

    pub async fn multi_get<T: DeserializeOwned>(&self, index: &str, ids: &[String], source_fields: &[&str]) -> Result<Vec<T>> {
        let hits = self.index.multi_get(index, ids, source_fields).await?;
        hits.into_iter().map(|hit| Ok(serde_json::from_value(hit)?)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        name: String,
    }

    #[derive(Default)]
    struct FakeCache {
        store: AsyncMutex<std::collections::HashMap<String, String>>,
        fail_gets: Mutex<bool>,
    }

    #[async_trait]
    impl Cache for FakeCache {
        async fn get_raw(&self, key: &str) -> Result<Option<String>> {
            if *self.fail_gets.lock().unwrap() {
                return Err(catalog_core::error::CatalogError::Transient("down".into()));
            }
            Ok(self.store.lock().await.get(key).cloned())
        }

        async fn set_raw(&self, key: &str, value: &str, _ttl: Duration) -> Result<()> {
            self.store.lock().await.insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeIndex {
        docs: std::collections::HashMap<(String, String), Value>,
    }

    #[async_trait]
    impl SearchIndex for FakeIndex {
        async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
            Ok(self.docs.get(&(index.to_string(), id.to_string())).cloned())
        }
        async fn search(&self, _index: &str, _body: Value) -> Result<Vec<Value>> {
            Ok(self.docs.values().cloned().collect())
        }
        async fn multi_get(&self, _index: &str, _ids: &[String], _source_fields: &[&str]) -> Result<Vec<Value>> {
            Ok(vec![])
        }
        async fn bulk_upsert(&self, _index: &str, _docs: Vec<(String, Value)>) -> Result<usize> {
            Ok(0)
        }
        async fn ensure_index(&self, _index: &str, _mapping: Value) -> Result<()> {
            Ok(())
        }
    }

    fn aside_with(cache: FakeCache, index: FakeIndex) -> CacheAside {
        CacheAside::new(Arc::new(cache), Arc::new(index), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let aside = aside_with(FakeCache::default(), FakeIndex::default());
        let key = aside.fingerprint(&[FingerprintPart::from("film_id"), FingerprintPart::from("1")]);
        aside.put_cached(&key, &Widget { name: "Matrix".into() }).await;
        let back: Option<Widget> = aside.get_cached(&key).await;
        assert_eq!(back, Some(Widget { name: "Matrix".into() }));
    }

    #[tokio::test]
    async fn cache_read_failure_is_treated_as_miss_not_error() {
        let cache = FakeCache::default();
        *cache.fail_gets.lock().unwrap() = true;
        let aside = aside_with(cache, FakeIndex::default());
        let back: Option<Widget> = aside.get_cached("any").await;
        assert_eq!(back, None);
    }

    #[tokio::test]
    async fn get_from_index_deserializes_present_document() {
        let mut index = FakeIndex::default();
        index.docs.insert(("movies".into(), "1".into()), serde_json::json!({"name": "Matrix"}));
        let aside = aside_with(FakeCache::default(), index);
        let doc: Option<Widget> = aside.get_from_index("movies", "1").await.unwrap();
        assert_eq!(doc, Some(Widget { name: "Matrix".into() }));
    }

    #[tokio::test]
    async fn get_from_index_returns_none_for_absent_document() {
        let aside = aside_with(FakeCache::default(), FakeIndex::default());
        let doc: Option<Widget> = aside.get_from_index("movies", "missing").await.unwrap();
        assert_eq!(doc, None);
    }
}
