//! Fan-out joiner (spec §4.4).
//!
//! Given a stream of external ids (e.g. changed `person` or `genre`
//! rows) and a join spec, emits the `{id, modified}` pairs from
//! `base_table` reachable through `merge_table`. This is what turns "a
//! person's name changed" into "these films need re-indexing"
//! (scenario 3, spec §8).

use catalog_core::backoff::BackoffDriver;
use catalog_core::error::{CatalogError, Result};
use chrono::{DateTime, Utc};
use futures::{pin_mut, Stream, StreamExt};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::producer::ProducerRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct MergerRow {
    pub id: Uuid,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MergerSpec {
    pub base_table: &'static str,
    pub base_table_id: &'static str,
    pub merge_table: &'static str,
    pub merge_table_id: &'static str,
    pub merge_table_fk: &'static str,
    pub batch_size: usize,
}

fn generate_sql(schema: &str, spec: &MergerSpec, foreign_keys: &[Uuid], last_order_value: Option<Uuid>) -> String {
    let fk_values = foreign_keys
        .iter()
        .map(|id| format!("'{id}'"))
        .collect::<Vec<_>>()
        .join(", ");
    let cursor = last_order_value
        .map(|id| format!("AND bt.{} > '{id}'", spec.base_table_id))
        .unwrap_or_default();
    format!(
        "SELECT DISTINCT bt.id, bt.modified \
         FROM {schema}.{} bt \
         LEFT JOIN {schema}.{} mt ON mt.{} = bt.{} \
         WHERE mt.{} IN ({fk_values}) {cursor} \
         ORDER BY bt.{} \
         LIMIT {}",
        spec.base_table,
        spec.merge_table,
        spec.merge_table_fk,
        spec.base_table_id,
        spec.merge_table_id,
        spec.base_table_id,
        spec.batch_size,
    )
}

async fn fetch_page(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    spec: &MergerSpec,
    foreign_keys: &[Uuid],
    last_order_value: Option<Uuid>,
) -> Result<Vec<MergerRow>> {
    let sql = generate_sql(schema, spec, foreign_keys, last_order_value);
    driver
        .retry(|| async {
            sqlx::query_as::<_, MergerRow>(&sql)
                .fetch_all(pool)
                .await
                .map_err(|err| CatalogError::Transient(format!("merger query failed: {err}")))
        })
        .await
}

/// Emits the `{id, modified}` pairs from `base_table` reachable from
/// `upstream`'s ids, batched `batch_size` at a time (spec §4.4).
pub async fn merge_all(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    spec: MergerSpec,
    upstream: impl Stream<Item = Result<ProducerRow>>,
) -> Result<Vec<MergerRow>> {
    pin_mut!(upstream);
    let mut ids = Vec::new();
    while let Some(row) = upstream.next().await {
        ids.push(row?.id);
    }

    let mut out = Vec::new();
    for chunk in ids.chunks(spec.batch_size) {
        let mut last_order_value = None;
        loop {
            let page = fetch_page(pool, driver, schema, &spec, chunk, last_order_value).await?;
            if page.is_empty() {
                break;
            }
            last_order_value = page.last().map(|row| row.id);
            out.extend(page);
        }
    }
    info!(base_table = spec.base_table, count = out.len(), "merger fanned out to base rows");
    Ok(out)
}
