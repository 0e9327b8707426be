//! Search-engine client used both by the ETL loader (writes, index
//! creation) and the query API (reads). Kept behind a trait so the query
//! services and the cache-aside layer can be unit-tested against an
//! in-memory fake instead of a live Elasticsearch cluster, the same
//! hexagonal split `ferrex-core::database::ports` uses for its Postgres
//! repositories.

use async_trait::async_trait;
use elasticsearch::{
    http::transport::Transport, BulkParts, Elasticsearch, GetParts, IndicesCreateParts,
    IndicesExistsParts, MgetParts, SearchParts,
};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{CatalogError, Result};

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Fetches one document's `_source` by id. `Ok(None)` means absent,
    /// never an error (spec §7's "not-found" taxonomy entry).
    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>>;

    /// Runs a query body and returns the `_source` of each hit, in the
    /// engine's native order.
    async fn search(&self, index: &str, body: Value) -> Result<Vec<Value>>;

    /// Multi-gets several ids from one index, optionally projecting only
    /// `source_fields` (spec §4.9 `get_films_for_person`).
    async fn multi_get(&self, index: &str, ids: &[String], source_fields: &[&str]) -> Result<Vec<Value>>;

    /// Bulk-upserts `(id, document)` pairs. Returns the number that
    /// succeeded; partial failures are logged and do not abort the
    /// batch (spec §4.7, §7).
    async fn bulk_upsert(&self, index: &str, docs: Vec<(String, Value)>) -> Result<usize>;

    /// Creates `index` with `mapping` if it does not already exist
    /// (spec §4.7).
    async fn ensure_index(&self, index: &str, mapping: Value) -> Result<()>;
}

pub struct ElasticsearchIndex {
    client: Elasticsearch,
}

impl ElasticsearchIndex {
    pub fn connect(url: &str) -> Result<Self> {
        let transport = Transport::single_node(url)
            .map_err(|err| CatalogError::Transient(format!("building ES transport: {err}")))?;
        Ok(Self { client: Elasticsearch::new(transport) })
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|err| CatalogError::Transient(format!("ES GET failed: {err}")))?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }
        let body: Value = response
            .json()
            .await
            .map_err(|err| CatalogError::Transient(format!("ES GET body decode failed: {err}")))?;
        if body.get("found").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }
        Ok(body.get("_source").cloned())
    }

    async fn search(&self, index: &str, body: Value) -> Result<Vec<Value>> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|err| CatalogError::Transient(format!("ES search failed: {err}")))?;

        if response.status_code().as_u16() == 404 {
            return Ok(Vec::new());
        }
        if !response.status_code().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Invalid(format!("ES rejected query: {text}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| CatalogError::Transient(format!("ES search body decode failed: {err}")))?;
        let hits = body
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(hits
            .into_iter()
            .filter_map(|hit| hit.get("_source").cloned())
            .collect())
    }

    async fn multi_get(&self, index: &str, ids: &[String], source_fields: &[&str]) -> Result<Vec<Value>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let docs: Vec<Value> = ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "_index": index,
                    "_id": id,
                    "_source": source_fields,
                })
            })
            .collect();

        let response = self
            .client
            .mget(MgetParts::None)
            .body(serde_json::json!({ "docs": docs }))
            .send()
            .await
            .map_err(|err| CatalogError::Transient(format!("ES mget failed: {err}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|err| CatalogError::Transient(format!("ES mget body decode failed: {err}")))?;
        let entries = body.get("docs").and_then(Value::as_array).cloned().unwrap_or_default();
        Ok(entries
            .into_iter()
            .filter(|doc| doc.get("found").and_then(Value::as_bool) == Some(true))
            .filter_map(|doc| doc.get("_source").cloned())
            .collect())
    }

    async fn bulk_upsert(&self, index: &str, docs: Vec<(String, Value)>) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }
        let mut body = Vec::with_capacity(docs.len() * 2);
        for (id, doc) in &docs {
            body.push(serde_json::json!({ "index": { "_index": index, "_id": id } }).to_string());
            body.push(doc.to_string());
        }
        let ndjson = body.join("\n") + "\n";

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(vec![ndjson])
            .send()
            .await
            .map_err(|err| CatalogError::Transient(format!("ES bulk request failed: {err}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|err| CatalogError::Transient(format!("ES bulk body decode failed: {err}")))?;

        let items = body.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
        let mut succeeded = 0usize;
        for item in &items {
            let status = item
                .values()
                .next()
                .and_then(|op| op.get("status"))
                .and_then(Value::as_u64)
                .unwrap_or(500);
            if (200..300).contains(&status) {
                succeeded += 1;
            } else {
                error!(?item, "bulk upsert item failed, row dropped (spec §7 at-least-once trade-off)");
            }
        }
        if succeeded != docs.len() {
            warn!(attempted = docs.len(), succeeded, index, "partial bulk upsert failure");
        } else {
            info!(count = succeeded, index, "bulk upsert succeeded");
        }
        Ok(succeeded)
    }

    async fn ensure_index(&self, index: &str, mapping: Value) -> Result<()> {
        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|err| CatalogError::Transient(format!("ES indices.exists failed: {err}")))?;
        if exists.status_code().is_success() {
            return Ok(());
        }

        self.client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(mapping)
            .send()
            .await
            .map_err(|err| CatalogError::Transient(format!("ES index creation failed: {err}")))?;
        info!(index, "created search index from mapping file");
        Ok(())
    }
}
