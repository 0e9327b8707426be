//! In-memory fakes for [`catalog_core::cache::Cache`] and
//! [`catalog_core::search::SearchIndex`], shared by every service's test
//! module so each one doesn't hand-roll its own (spec §1.5: hand-written
//! fakes in place of a live Redis/Elasticsearch instance).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use catalog_core::cache::Cache;
use catalog_core::error::Result;
use catalog_core::search::SearchIndex;
use serde_json::Value;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct FakeCache {
    store: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl Cache for FakeCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.lock().await.get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: &str, _ttl: Duration) -> Result<()> {
        self.store.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Keyed by `(index, id)`; `search`/`multi_get` scan every stored
/// document in insertion order rather than honoring the query body, so
/// tests seed only the documents a given assertion cares about.
#[derive(Default)]
pub struct FakeIndex {
    pub docs: Mutex<Vec<(String, String, Value)>>,
}

impl FakeIndex {
    pub async fn put(&self, index: &str, id: &str, doc: Value) {
        self.docs.lock().await.push((index.to_string(), id.to_string(), doc));
    }
}

#[async_trait]
impl SearchIndex for FakeIndex {
    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .docs
            .lock()
            .await
            .iter()
            .find(|(i, d_id, _)| i == index && d_id == id)
            .map(|(_, _, doc)| doc.clone()))
    }

    async fn search(&self, index: &str, _body: Value) -> Result<Vec<Value>> {
        Ok(self
            .docs
            .lock()
            .await
            .iter()
            .filter(|(i, _, _)| i == index)
            .map(|(_, _, doc)| doc.clone())
            .collect())
    }

    async fn multi_get(&self, index: &str, ids: &[String], _source_fields: &[&str]) -> Result<Vec<Value>> {
        let docs = self.docs.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| docs.iter().find(|(i, d_id, _)| i == index && d_id == id).map(|(_, _, doc)| doc.clone()))
            .collect())
    }

    async fn bulk_upsert(&self, _index: &str, _docs: Vec<(String, Value)>) -> Result<usize> {
        Ok(0)
    }

    async fn ensure_index(&self, _index: &str, _mapping: Value) -> Result<()> {
        Ok(())
    }
}
