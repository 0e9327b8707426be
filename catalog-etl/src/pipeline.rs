//! Orchestrates the five sync tasks that keep the search indices current
//! (spec §2, §3): three independent tasks fan into the `movies` index
//! (changed films directly, changed persons/genres via the merger) and
//! two supplemental tasks keep the `persons` and `genres` indices
//! themselves in sync — grounded on `ExtractorConfig`'s `films` /
//! `persons` / `genres` task triplet in the original pipeline's
//! settings module, which the distilled spec only described for the
//! movies fan-out.

use std::sync::Arc;

use catalog_core::backoff::BackoffDriver;
use catalog_core::error::Result;
use catalog_core::model::{Genre, PersonDocument, PersonFilmCredit};
use catalog_core::search::SearchIndex;
use catalog_core::state::State;
use futures::StreamExt;
use sqlx::{FromRow, PgPool};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::aggregator::aggregate;
use crate::enricher::enrich_all;
use crate::loader::load_documents;
use crate::merger::{merge_all, MergerSpec};
use crate::producer::{stream_changes, ProducerSpec};

const MOVIES_INDEX: &str = "movies";
const PERSONS_INDEX: &str = "persons";
const GENRES_INDEX: &str = "genres";

/// Runs one `{producer} -> enricher -> aggregator -> loader` task whose
/// changed ids come straight from `base_table` (the films task, spec
/// §2 row 1).
pub async fn sync_films_to_movies(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    state: Arc<Mutex<State>>,
    client: &impl SearchIndex,
    batch_size: usize,
) -> Result<usize> {
    let spec = ProducerSpec { table: "film_work", state_key: "films_modified", order_key: "modified" };
    let stream = stream_changes(pool, driver, schema, spec, state);
    futures::pin_mut!(stream);
    let mut film_ids = Vec::new();
    while let Some(row) = stream.next().await {
        film_ids.push(row?.id);
    }
    sync_film_ids_to_movies(pool, driver, schema, client, batch_size, &film_ids).await
}

/// Runs `{producer(persons)} -> merger -> enricher -> aggregator ->
/// loader}` (spec §2 row 2): a changed person fans out to every film
/// they appear in.
pub async fn sync_persons_to_movies(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    state: Arc<Mutex<State>>,
    client: &impl SearchIndex,
    batch_size: usize,
) -> Result<usize> {
    let producer_spec = ProducerSpec { table: "person", state_key: "persons_modified", order_key: "modified" };
    let upstream = stream_changes(pool, driver, schema, producer_spec, state);
    let merger_spec = MergerSpec {
        base_table: "film_work",
        base_table_id: "id",
        merge_table: "person_film_work",
        merge_table_id: "person_id",
        merge_table_fk: "film_work_id",
        batch_size,
    };
    let merged = merge_all(pool, driver, schema, merger_spec, upstream).await?;
    let film_ids: Vec<Uuid> = merged.into_iter().map(|row| row.id).collect();
    sync_film_ids_to_movies(pool, driver, schema, client, batch_size, &film_ids).await
}

/// Runs `{producer(genres)} -> merger -> enricher -> aggregator ->
/// loader}` (spec §2 row 3).
pub async fn sync_genres_to_movies(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    state: Arc<Mutex<State>>,
    client: &impl SearchIndex,
    batch_size: usize,
) -> Result<usize> {
    let producer_spec = ProducerSpec { table: "genre", state_key: "genres_modified", order_key: "modified" };
    let upstream = stream_changes(pool, driver, schema, producer_spec, state);
    let merger_spec = MergerSpec {
        base_table: "film_work",
        base_table_id: "id",
        merge_table: "genre_film_work",
        merge_table_id: "genre_id",
        merge_table_fk: "film_work_id",
        batch_size,
    };
    let merged = merge_all(pool, driver, schema, merger_spec, upstream).await?;
    let film_ids: Vec<Uuid> = merged.into_iter().map(|row| row.id).collect();
    sync_film_ids_to_movies(pool, driver, schema, client, batch_size, &film_ids).await
}

async fn sync_film_ids_to_movies(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    client: &impl SearchIndex,
    batch_size: usize,
    film_ids: &[Uuid],
) -> Result<usize> {
    if film_ids.is_empty() {
        return Ok(0);
    }
    let rows = enrich_all(pool, driver, schema, film_ids, batch_size).await?;
    let docs = aggregate(&rows);
    let pairs: Vec<(String, _)> = docs.into_iter().map(|doc| (doc.id.to_string(), doc)).collect();
    load_documents(client, MOVIES_INDEX, pairs, batch_size).await
}

#[derive(Debug, FromRow)]
struct PersonFilmRow {
    person_id: Uuid,
    full_name: String,
    film_id: Uuid,
    title: String,
    role: String,
}

async fn fetch_person_documents(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    person_ids: &[Uuid],
) -> Result<Vec<PersonDocument>> {
    if person_ids.is_empty() {
        return Ok(Vec::new());
    }
    let fk_values = person_ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT p.id as person_id, p.full_name, fw.id as film_id, fw.title, pfw.role \
         FROM {schema}.person p \
         JOIN {schema}.person_film_work pfw ON pfw.person_id = p.id \
         JOIN {schema}.film_work fw ON fw.id = pfw.film_work_id \
         WHERE p.id IN ({fk_values}) \
         ORDER BY p.id, fw.id"
    );
    let rows: Vec<PersonFilmRow> = driver
        .retry(|| async {
            sqlx::query_as::<_, PersonFilmRow>(&sql)
                .fetch_all(pool)
                .await
                .map_err(|err| catalog_core::error::CatalogError::Transient(format!("person index query failed: {err}")))
        })
        .await?;

    let mut docs: Vec<PersonDocument> = Vec::new();
    for row in rows {
        match docs.last_mut() {
            Some(doc) if doc.id == row.person_id => {
                match doc.films.iter_mut().find(|f| f.film_id == row.film_id) {
                    Some(credit) => credit.roles.push(row.role),
                    None => doc.films.push(PersonFilmCredit {
                        film_id: row.film_id,
                        title: row.title,
                        roles: vec![row.role],
                    }),
                }
            }
            _ => docs.push(PersonDocument {
                id: row.person_id,
                full_name: row.full_name,
                films: vec![PersonFilmCredit { film_id: row.film_id, title: row.title, roles: vec![row.role] }],
            }),
        }
    }
    Ok(docs)
}

/// Keeps the `persons` index itself current (spec §3 supplement,
/// grounded on `schema.py`'s `ESPersons` document).
pub async fn sync_persons_index(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    state: Arc<Mutex<State>>,
    client: &impl SearchIndex,
    batch_size: usize,
) -> Result<usize> {
    let spec = ProducerSpec { table: "person", state_key: "persons_index_modified", order_key: "modified" };
    let stream = stream_changes(pool, driver, schema, spec, state);
    futures::pin_mut!(stream);
    let mut person_ids = Vec::new();
    while let Some(row) = stream.next().await {
        person_ids.push(row?.id);
    }
    let docs = fetch_person_documents(pool, driver, schema, &person_ids).await?;
    let pairs: Vec<(String, _)> = docs.into_iter().map(|doc| (doc.id.to_string(), doc)).collect();
    load_documents(client, PERSONS_INDEX, pairs, batch_size).await
}

#[derive(Debug, FromRow)]
struct GenreRow {
    id: Uuid,
    name: String,
}

async fn fetch_genre_documents(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    genre_ids: &[Uuid],
) -> Result<Vec<Genre>> {
    if genre_ids.is_empty() {
        return Ok(Vec::new());
    }
    let fk_values = genre_ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
    let sql = format!("SELECT id, name FROM {schema}.genre WHERE id IN ({fk_values})");
    let rows: Vec<GenreRow> = driver
        .retry(|| async {
            sqlx::query_as::<_, GenreRow>(&sql)
                .fetch_all(pool)
                .await
                .map_err(|err| catalog_core::error::CatalogError::Transient(format!("genre index query failed: {err}")))
        })
        .await?;
    Ok(rows.into_iter().map(|row| Genre { uuid: row.id, name: row.name }).collect())
}

/// Keeps the `genres` index itself current (spec §3 supplement).
pub async fn sync_genres_index(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    state: Arc<Mutex<State>>,
    client: &impl SearchIndex,
    batch_size: usize,
) -> Result<usize> {
    let spec = ProducerSpec { table: "genre", state_key: "genres_index_modified", order_key: "modified" };
    let stream = stream_changes(pool, driver, schema, spec, state);
    futures::pin_mut!(stream);
    let mut genre_ids = Vec::new();
    while let Some(row) = stream.next().await {
        genre_ids.push(row?.id);
    }
    let docs = fetch_genre_documents(pool, driver, schema, &genre_ids).await?;
    let pairs: Vec<(String, _)> = docs.into_iter().map(|doc| (doc.uuid.to_string(), doc)).collect();
    load_documents(client, GENRES_INDEX, pairs, batch_size).await
}

/// Runs all five tasks once, returning the total number of documents
/// written across every index.
pub async fn run_once(
    pool: &PgPool,
    driver: &BackoffDriver,
    schema: &str,
    state: Arc<Mutex<State>>,
    client: &impl SearchIndex,
    batch_size: usize,
) -> Result<usize> {
    let mut total = 0usize;
    total += sync_films_to_movies(pool, driver, schema, state.clone(), client, batch_size).await?;
    total += sync_persons_to_movies(pool, driver, schema, state.clone(), client, batch_size).await?;
    total += sync_genres_to_movies(pool, driver, schema, state.clone(), client, batch_size).await?;
    total += sync_persons_index(pool, driver, schema, state.clone(), client, batch_size).await?;
    total += sync_genres_index(pool, driver, schema, state.clone(), client, batch_size).await?;
    info!(total, "sync cycle complete");
    Ok(total)
}
