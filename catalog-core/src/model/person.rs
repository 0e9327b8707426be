use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One film a person is credited on, as stored in the `persons` index.
///
/// Invariant (spec §3): every entry in `roles` is there because the
/// enricher actually saw that (film, person, role) row — the set is
/// derived, never free-form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonFilmCredit {
    pub film_id: Uuid,
    pub title: String,
    pub roles: Vec<String>,
}

/// The document the persons pipeline upserts into the `persons` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonDocument {
    pub id: Uuid,
    pub full_name: String,
    pub films: Vec<PersonFilmCredit>,
}

/// The API-facing shape of a person, identical to `PersonDocument` save
/// for the `uuid` field rename spec §6 requires on every external
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub uuid: Uuid,
    pub full_name: String,
    pub films: Vec<PersonFilmCredit>,
}

impl From<PersonDocument> for Person {
    fn from(doc: PersonDocument) -> Self {
        Self {
            uuid: doc.id,
            full_name: doc.full_name,
            films: doc.films,
        }
    }
}

/// One row of `GET /persons/{id}/film/`: the two-step multi-get result
/// described in spec §4.9 (`get_films_for_person`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonFilm {
    pub uuid: Uuid,
    pub title: String,
    pub imdb_rating: Option<f64>,
}
