//! `PersonService` (spec §4.9).

use catalog_core::cache::FingerprintPart;
use catalog_core::error::Result;
use catalog_core::model::{Person, PersonDocument, PersonFilm};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::cache_aside::CacheAside;
use crate::pagination::Page;
use crate::services::{MOVIES_INDEX, PERSONS_INDEX};

pub struct PersonService {
    aside: CacheAside,
}

/// Projection of a `MovieDocument` requested via multi-get
/// (`id`/`title`/`imdb_rating` only, spec §4.9 `get_films_for_person`).
#[derive(Debug, Deserialize)]
struct MovieProjection {
    id: Uuid,
    title: String,
    imdb_rating: Option<f64>,
}

impl PersonService {
    pub fn new(aside: CacheAside) -> Self {
        Self { aside }
    }

    /// `GET /persons/{id}`, cached under `person_id:<id>`.
    pub async fn get_by_id(&self, person_id: Uuid) -> Result<Option<Person>> {
        let key = self.aside.fingerprint(&[FingerprintPart::from("person_id"), person_id.into()]);
        if let Some(cached) = self.aside.get_cached::<Person>(&key).await {
            return Ok(Some(cached));
        }

        let doc: Option<PersonDocument> = self.aside.get_from_index(PERSONS_INDEX, &person_id.to_string()).await?;
        let Some(doc) = doc else {
            return Ok(None);
        };
        let person = Person::from(doc);
        self.aside.put_cached(&key, &person).await;
        Ok(Some(person))
    }

    /// `GET /persons/{id}/film/` (spec §4.9): fetches the person
    /// document, then multi-gets the `id/title/imdb_rating` projection
    /// of every film they are credited on. Cached under
    /// `person_films:<id>`.
    pub async fn get_films_for_person(&self, person_id: Uuid) -> Result<Option<Vec<PersonFilm>>> {
        let key = self.aside.fingerprint(&[FingerprintPart::from("person_films"), person_id.into()]);
        if let Some(cached) = self.aside.get_cached::<Vec<PersonFilm>>(&key).await {
            return Ok(Some(cached));
        }

        let doc: Option<PersonDocument> = self.aside.get_from_index(PERSONS_INDEX, &person_id.to_string()).await?;
        let Some(doc) = doc else {
            return Ok(None);
        };
        if doc.films.is_empty() {
            return Ok(None);
        }

        let film_ids: Vec<String> = doc.films.iter().map(|credit| credit.film_id.to_string()).collect();
        let projections: Vec<MovieProjection> = self
            .aside
            .multi_get(MOVIES_INDEX, &film_ids, &["id", "title", "imdb_rating"])
            .await?;
        if projections.is_empty() {
            return Ok(None);
        }

        let films: Vec<PersonFilm> = projections
            .into_iter()
            .map(|p| PersonFilm { uuid: p.id, title: p.title, imdb_rating: p.imdb_rating })
            .collect();
        self.aside.put_cached(&key, &films).await;
        Ok(Some(films))
    }

    /// `GET /persons/search/` (spec §4.9). Not cached, same as the
    /// free-text film title search (spec §9 Open Question 2).
    pub async fn search_person(&self, name: &str, page: Page) -> Result<Option<Vec<Person>>> {
        let body = json!({
            "query": { "match": { "full_name": { "query": name, "fuzziness": "AUTO" } } },
            "from": page.from_offset(),
            "size": page.size,
        });
        let docs: Vec<PersonDocument> = self.aside.search_index(PERSONS_INDEX, body).await?;
        if docs.is_empty() {
            return Ok(None);
        }
        Ok(Some(docs.into_iter().map(Person::from).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeCache, FakeIndex};
    use catalog_core::model::PersonFilmCredit;
    use std::sync::Arc;
    use std::time::Duration;

    fn service_with(index: FakeIndex) -> PersonService {
        PersonService::new(CacheAside::new(Arc::new(FakeCache::default()), Arc::new(index), Duration::from_secs(300)))
    }

    #[tokio::test]
    async fn get_by_id_returns_absent_for_unknown_person() {
        let service = service_with(FakeIndex::default());
        assert_eq!(service.get_by_id(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_films_for_person_returns_absent_when_person_has_no_credits() {
        let person_id = Uuid::new_v4();
        let index = FakeIndex::default();
        index
            .put(
                PERSONS_INDEX,
                &person_id.to_string(),
                json!({"id": person_id, "full_name": "Keanu Reeves", "films": []}),
            )
            .await;
        let service = service_with(index);
        // the person document itself exists...
        assert!(service.get_by_id(person_id).await.unwrap().is_some());
        // ...but zero credits is still "absent", not an empty list (spec §4.9).
        assert_eq!(service.get_films_for_person(person_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_films_for_person_multi_gets_credited_films() {
        let person_id = Uuid::new_v4();
        let film_id = Uuid::new_v4();
        let index = FakeIndex::default();
        index
            .put(
                PERSONS_INDEX,
                &person_id.to_string(),
                serde_json::to_value(PersonDocument {
                    id: person_id,
                    full_name: "Keanu Reeves".into(),
                    films: vec![PersonFilmCredit { film_id, title: "The Matrix".into(), roles: vec!["actor".into()] }],
                })
                .unwrap(),
            )
            .await;
        index
            .put(MOVIES_INDEX, &film_id.to_string(), json!({"id": film_id, "title": "The Matrix", "imdb_rating": 8.7}))
            .await;

        let service = service_with(index);
        let films = service.get_films_for_person(person_id).await.unwrap().expect("films present");
        assert_eq!(films, vec![PersonFilm { uuid: film_id, title: "The Matrix".into(), imdb_rating: Some(8.7) }]);
    }

    #[tokio::test]
    async fn search_person_returns_absent_for_no_hits() {
        let service = service_with(FakeIndex::default());
        let page = Page::validate(None, None).unwrap();
        assert_eq!(service.search_person("nobody", page).await.unwrap(), None);
    }
}
