//! Row enricher (spec §4.5).
//!
//! Given a batch of film ids, emits one denormalized row per
//! (film, person, role, genre) combination via a paginated LEFT JOIN
//! against `film_work × person_film_work × person × genre_film_work ×
//! genre`. Rows are emitted in `film.id` order within each input batch
//! so the aggregator sees every row for one film contiguously.

use catalog_core::backoff::BackoffDriver;
use catalog_core::error::{CatalogError, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct EnricherRow {
    pub film_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    #[sqlx(rename = "type")]
    pub film_type: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub role: Option<String>,
    pub person_id: Option<Uuid>,
    pub person_full_name: Option<String>,
    pub genre_name: Option<String>,
}

fn generate_sql(schema: &str, film_ids: &[Uuid], last_seen: Option<Uuid>, batch: usize) -> String {
    let fk_values = film_ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
    let cursor = last_seen.map(|id| format!("AND fw.id > '{id}'")).unwrap_or_default();
    format!(
        "SELECT DISTINCT \
            fw.id as film_id, fw.title, fw.description, fw.rating, fw.type, fw.created, fw.modified, \
            pfw.role as role, p.id as person_id, p.full_name as person_full_name, g.name as genre_name \
         FROM {schema}.film_work fw \
         LEFT JOIN {schema}.person_film_work pfw ON pfw.film_work_id = fw.id \
         LEFT JOIN {schema}.person p ON p.id = pfw.person_id \
         LEFT JOIN {schema}.genre_film_work gfw ON gfw.film_work_id = fw.id \
         LEFT JOIN {schema}.genre g ON g.id = gfw.genre_id \
         WHERE fw.id IN ({fk_values}) {cursor} \
         ORDER BY fw.id \
         LIMIT {batch}"
    )
}

async fn fetch_page(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    film_ids: &[Uuid],
    last_seen: Option<Uuid>,
    batch: usize,
) -> Result<Vec<EnricherRow>> {
    let sql = generate_sql(schema, film_ids, last_seen, batch);
    driver
        .retry(|| async {
            sqlx::query_as::<_, EnricherRow>(&sql)
                .fetch_all(pool)
                .await
                .map_err(|err| CatalogError::Transient(format!("enricher query failed: {err}")))
        })
        .await
}

/// Enriches `film_ids`, batching `batch_size` at a time (spec §4.5).
pub async fn enrich_all(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    film_ids: &[Uuid],
    batch_size: usize,
) -> Result<Vec<EnricherRow>> {
    let mut out = Vec::new();
    for chunk in film_ids.chunks(batch_size) {
        let mut last_seen = None;
        loop {
            let page = fetch_page(pool, driver, schema, chunk, last_seen, batch_size).await?;
            if page.is_empty() {
                break;
            }
            last_seen = page.last().map(|row| row.film_id);
            out.extend(page);
        }
    }
    info!(films = film_ids.len(), rows = out.len(), "enriched film rows");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_filters_by_batch_of_ids() {
        let id = Uuid::nil();
        let sql = generate_sql("content", &[id], None, 1000);
        assert!(sql.contains(&id.to_string()));
        assert!(sql.contains("ORDER BY fw.id"));
    }
}
