//! `FilmService` (spec §4.9).

use catalog_core::cache::FingerprintPart;
use catalog_core::error::{CatalogError, Result};
use catalog_core::model::{DetailFilm, Genre, GenreRef, MovieDocument, ShortFilm};
use serde_json::json;
use uuid::Uuid;

use crate::cache_aside::CacheAside;
use crate::pagination::Page;
use crate::services::{GENRES_INDEX, MOVIES_INDEX};

pub struct FilmService {
    aside: CacheAside,
}

impl FilmService {
    pub fn new(aside: CacheAside) -> Self {
        Self { aside }
    }

    /// `GET /films/{id}` (spec §4.9, §6). The indexed document stores
    /// genres as bare names; each is resolved to its id via a secondary
    /// `match_phrase` search against the genres index.
    pub async fn get_by_id(&self, film_id: Uuid) -> Result<Option<DetailFilm>> {
        let key = self.aside.fingerprint(&[FingerprintPart::from("film_id"), film_id.into()]);
        if let Some(cached) = self.aside.get_cached::<DetailFilm>(&key).await {
            return Ok(Some(cached));
        }

        let doc: Option<MovieDocument> = self.aside.get_from_index(MOVIES_INDEX, &film_id.to_string()).await?;
        let Some(doc) = doc else {
            return Ok(None);
        };

        let genres = self.resolve_genre_refs(&doc.genre).await?;
        let detail = DetailFilm::from_document(doc, genres);
        self.aside.put_cached(&key, &detail).await;
        Ok(Some(detail))
    }

    async fn resolve_genre_refs(&self, names: &[String]) -> Result<Vec<GenreRef>> {
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let body = json!({
                "query": { "match_phrase": { "name": name } },
                "size": 1,
            });
            let hits: Vec<Genre> = self.aside.search_index(GENRES_INDEX, body).await?;
            if let Some(genre) = hits.into_iter().next() {
                out.push(GenreRef { id: genre.uuid, name: genre.name });
            }
        }
        Ok(out)
    }

    /// `GET /films/` sorted/paginated/genre-filtered listing (spec §4.9).
    pub async fn get_by_sort(&self, sort: &str, page: Page, genre_id: Option<Uuid>) -> Result<Option<Vec<ShortFilm>>> {
        let descending = parse_sort(sort)?;

        let genre_name = match genre_id {
            Some(id) => match self.aside.get_from_index::<Genre>(GENRES_INDEX, &id.to_string()).await? {
                Some(genre) => Some(genre.name),
                None => return Ok(None),
            },
            None => None,
        };

        let key = self.aside.fingerprint(&[
            FingerprintPart::from("sort"),
            FingerprintPart::from(sort),
            FingerprintPart::from(page.size as i64),
            FingerprintPart::from(page.number as i64),
            FingerprintPart::from(genre_id),
        ]);
        if let Some(cached) = self.aside.get_cached::<Vec<ShortFilm>>(&key).await {
            return Ok(Some(cached));
        }

        let query = match &genre_name {
            Some(name) => json!({ "match": { "genre": name } }),
            None => json!({ "match_all": {} }),
        };
        let body = json!({
            "query": query,
            "sort": [{ "imdb_rating": if descending { "desc" } else { "asc" } }],
            "from": page.from_offset(),
            "size": page.size,
        });

        let docs: Vec<MovieDocument> = self.aside.search_index(MOVIES_INDEX, body).await?;
        if docs.is_empty() {
            return Ok(None);
        }
        let films: Vec<ShortFilm> = docs
            .into_iter()
            .map(|doc| ShortFilm { uuid: doc.id, title: doc.title, imdb_rating: doc.imdb_rating })
            .collect();
        self.aside.put_cached(&key, &films).await;
        Ok(Some(films))
    }

    /// `GET /films/search` free-text title search (spec §4.9). Not
    /// cached — spec §9 Open Question 2 leaves this as an open design
    /// question and directs implementers to preserve the behavior as-is.
    pub async fn get_by_query(&self, title: &str, page: Page) -> Result<Option<Vec<ShortFilm>>> {
        let body = json!({
            "query": { "match": { "title": { "query": title, "fuzziness": "AUTO" } } },
            "from": page.from_offset(),
            "size": page.size,
        });
        let docs: Vec<MovieDocument> = self.aside.search_index(MOVIES_INDEX, body).await?;
        if docs.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            docs.into_iter()
                .map(|doc| ShortFilm { uuid: doc.id, title: doc.title, imdb_rating: doc.imdb_rating })
                .collect(),
        ))
    }
}

/// `sort` must match `^-?imdb_rating$` (spec §4.9); returns whether it
/// is descending.
fn parse_sort(sort: &str) -> Result<bool> {
    match sort {
        "imdb_rating" => Ok(false),
        "-imdb_rating" => Ok(true),
        other => Err(CatalogError::Invalid(format!("unsupported sort `{other}`, expected `imdb_rating` or `-imdb_rating`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeCache, FakeIndex};
    use catalog_core::model::PersonRef;
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn ascending_sort_parses() {
        assert!(!parse_sort("imdb_rating").unwrap());
    }

    #[test]
    fn descending_sort_parses() {
        assert!(parse_sort("-imdb_rating").unwrap());
    }

    #[test]
    fn unsupported_sort_field_is_rejected() {
        assert!(parse_sort("title").is_err());
        assert!(parse_sort("-title").is_err());
    }

    fn sample_doc(id: Uuid) -> MovieDocument {
        MovieDocument {
            id,
            title: "The Matrix".into(),
            description: Some("A hacker discovers reality is a simulation.".into()),
            imdb_rating: Some(8.7),
            genre: vec!["Action".into()],
            director: vec![],
            actors: vec![PersonRef { id: Uuid::new_v4(), name: "Keanu Reeves".into() }],
            writers: vec![],
            actors_names: vec!["Keanu Reeves".into()],
            writers_names: vec![],
            modified: Utc::now(),
        }
    }

    fn service_with(cache: FakeCache, index: FakeIndex) -> FilmService {
        FilmService::new(CacheAside::new(Arc::new(cache), Arc::new(index), Duration::from_secs(300)))
    }

    #[tokio::test]
    async fn get_by_id_resolves_genre_and_caches() {
        let film_id = Uuid::new_v4();
        let genre_id = Uuid::new_v4();
        let index = FakeIndex::default();
        index.put(MOVIES_INDEX, &film_id.to_string(), serde_json::to_value(sample_doc(film_id)).unwrap()).await;
        index.put(GENRES_INDEX, &genre_id.to_string(), serde_json::json!({"uuid": genre_id, "name": "Action"})).await;

        let service = service_with(FakeCache::default(), index);
        let first = service.get_by_id(film_id).await.unwrap().expect("film present");
        assert_eq!(first.genre, vec![GenreRef { id: genre_id, name: "Action".into() }]);

        // second call is served from cache, same result, no index re-read needed to succeed.
        let second = service.get_by_id(film_id).await.unwrap().expect("film present");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn get_by_id_returns_absent_for_missing_film() {
        let service = service_with(FakeCache::default(), FakeIndex::default());
        assert_eq!(service.get_by_id(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_by_sort_returns_absent_for_unknown_genre() {
        let service = service_with(FakeCache::default(), FakeIndex::default());
        let page = Page::validate(None, None).unwrap();
        assert_eq!(service.get_by_sort("imdb_rating", page, Some(Uuid::new_v4())).await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_by_sort_returns_absent_for_empty_hits() {
        let service = service_with(FakeCache::default(), FakeIndex::default());
        let page = Page::validate(None, None).unwrap();
        assert_eq!(service.get_by_sort("imdb_rating", page, None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_by_sort_rejects_invalid_sort_field() {
        let service = service_with(FakeCache::default(), FakeIndex::default());
        let page = Page::validate(None, None).unwrap();
        assert!(service.get_by_sort("title", page, None).await.is_err());
    }
}
