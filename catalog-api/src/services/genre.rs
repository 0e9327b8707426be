//! `GenreService` (spec §4.9).

use catalog_core::cache::FingerprintPart;
use catalog_core::error::Result;
use catalog_core::model::Genre;
use serde_json::json;
use uuid::Uuid;

use crate::cache_aside::CacheAside;
use crate::services::GENRES_INDEX;

pub struct GenreService {
    aside: CacheAside,
}

impl GenreService {
    pub fn new(aside: CacheAside) -> Self {
        Self { aside }
    }

    /// `GET /genres/`, cached under a fixed `all_genres` key.
    pub async fn get_all(&self) -> Result<Option<Vec<Genre>>> {
        let key = self.aside.fingerprint(&[FingerprintPart::from("all_genres")]);
        if let Some(cached) = self.aside.get_cached::<Vec<Genre>>(&key).await {
            return Ok(Some(cached));
        }

        let body = json!({ "query": { "match_all": {} }, "size": 1000 });
        let genres: Vec<Genre> = self.aside.search_index(GENRES_INDEX, body).await?;
        if genres.is_empty() {
            return Ok(None);
        }
        self.aside.put_cached(&key, &genres).await;
        Ok(Some(genres))
    }

    /// `GET /genres/{id}`, cached under `genre_id:<id>`.
    pub async fn get_by_id(&self, genre_id: Uuid) -> Result<Option<Genre>> {
        let key = self.aside.fingerprint(&[FingerprintPart::from("genre_id"), genre_id.into()]);
        if let Some(cached) = self.aside.get_cached::<Genre>(&key).await {
            return Ok(Some(cached));
        }

        let genre: Option<Genre> = self.aside.get_from_index(GENRES_INDEX, &genre_id.to_string()).await?;
        if let Some(genre) = &genre {
            self.aside.put_cached(&key, genre).await;
        }
        Ok(genre)
    }
}
