//! Index loader (spec §4.7).
//!
//! Ensures the target index exists (idempotent, mapping loaded once from
//! `INDEX_PATH/<index>.json`) and bulk-upserts aggregated documents in
//! batches of `batch_size`, logging per-batch outcomes through
//! [`SearchIndex::bulk_upsert`]'s own success-count accounting.

use catalog_core::error::{CatalogError, Result};
use catalog_core::search::SearchIndex;
use serde::Serialize;
use tracing::{info, warn};

/// Loads `mapping/<index>.json` from `index_path`, returning `None` if the
/// file is absent (some indices, e.g. `genres`, are small enough that a
/// dynamic mapping is acceptable).
pub fn load_mapping(index_path: &std::path::Path, index: &str) -> Result<Option<serde_json::Value>> {
    let file = index_path.join(format!("{index}.json"));
    match std::fs::read_to_string(&file) {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(CatalogError::Internal(format!("reading mapping {}: {err}", file.display()))),
    }
}

/// Creates `index` if it does not already exist, applying `mapping` when
/// one was found on disk.
pub async fn ensure_index(client: &impl SearchIndex, index: &str, mapping: Option<serde_json::Value>) -> Result<()> {
    client.ensure_index(index, mapping.unwrap_or_else(|| serde_json::json!({}))).await
}

/// Bulk-upserts `docs` (already serialized id/body pairs) in chunks of
/// `batch_size`, returning the total number of documents the search
/// engine acknowledged. A partial batch failure is logged but does not
/// abort the remaining batches (spec §7: the loader is retried as a
/// whole on the next cycle, which re-upserts already-indexed documents
/// harmlessly).
pub async fn load_documents<T: Serialize>(
    client: &impl SearchIndex,
    index: &str,
    docs: Vec<(String, T)>,
    batch_size: usize,
) -> Result<usize> {
    let mut total = 0usize;
    for chunk in docs.chunks(batch_size) {
        let batch: Vec<(String, serde_json::Value)> = chunk
            .iter()
            .map(|(id, doc)| Ok((id.clone(), serde_json::to_value(doc)?)))
            .collect::<Result<_>>()?;
        let requested = batch.len();
        let indexed = client.bulk_upsert(index, batch).await?;
        if indexed < requested {
            warn!(index, requested, indexed, "bulk upsert batch partially failed");
        } else {
            info!(index, indexed, "bulk upsert batch succeeded");
        }
        total += indexed;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeIndex {
        created: Mutex<Vec<String>>,
        upserted: Mutex<Vec<(String, String)>>,
        fail_first_n: Mutex<usize>,
    }

    #[async_trait]
    impl SearchIndex for FakeIndex {
        async fn get_document(&self, _index: &str, _id: &str) -> Result<Option<Value>> {
            Ok(None)
        }

        async fn search(&self, _index: &str, _body: Value) -> Result<Vec<Value>> {
            Ok(vec![])
        }

        async fn multi_get(&self, _index: &str, _ids: &[String], _source_fields: &[&str]) -> Result<Vec<Value>> {
            Ok(vec![])
        }

        async fn bulk_upsert(&self, index: &str, docs: Vec<(String, Value)>) -> Result<usize> {
            let mut fail = self.fail_first_n.lock().unwrap();
            let mut upserted = self.upserted.lock().unwrap();
            let mut ok = 0;
            for (id, _doc) in docs {
                if *fail > 0 {
                    *fail -= 1;
                    continue;
                }
                upserted.push((index.to_string(), id));
                ok += 1;
            }
            Ok(ok)
        }

        async fn ensure_index(&self, index: &str, _mapping: Value) -> Result<()> {
            self.created.lock().unwrap().push(index.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn loads_all_documents_across_batches() {
        let client = FakeIndex::default();
        let docs: Vec<(String, Value)> = (0..5).map(|i| (i.to_string(), json!({"n": i}))).collect();
        let total = load_documents(&client, "movies", docs, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(client.upserted.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn partial_batch_failure_does_not_abort_remaining_batches() {
        let client = FakeIndex::default();
        *client.fail_first_n.lock().unwrap() = 1;
        let docs: Vec<(String, Value)> = (0..4).map(|i| (i.to_string(), json!({"n": i}))).collect();
        let total = load_documents(&client, "movies", docs, 2).await.unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn ensure_index_is_called_with_loaded_mapping() {
        let client = FakeIndex::default();
        ensure_index(&client, "movies", Some(json!({"mappings": {}}))).await.unwrap();
        assert_eq!(client.created.lock().unwrap().as_slice(), ["movies"]);
    }

    #[test]
    fn missing_mapping_file_yields_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_mapping(dir.path(), "genres").unwrap();
        assert!(result.is_none());
    }
}
