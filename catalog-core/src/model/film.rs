use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person's id/name pair, used for actors, writers and directors alike.
///
/// The original source only kept `full_name` for directors and a
/// structured `{id, name}` pair for actors/writers. This is a known
/// under-modeling (spec §9 Open Question 3); directors are projected the
/// same way here since the enricher row already carries `person_id` for
/// every role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
}

/// A genre reference resolved to its id, used on the API-facing
/// `DetailFilm`. The indexed `MovieDocument` only carries genre names
/// (spec §4.9 `get_by_id`); resolving the id is the query service's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRef {
    pub id: Uuid,
    pub name: String,
}

/// The document the ETL pipeline upserts into the `movies` search index.
///
/// Invariants (spec §3): `actors_names`/`writers_names` are exactly the
/// projection of `actors`/`writers`; a film with no people still indexes
/// with empty lists, never missing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDocument {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub imdb_rating: Option<f64>,
    pub genre: Vec<String>,
    pub director: Vec<PersonRef>,
    pub actors: Vec<PersonRef>,
    pub writers: Vec<PersonRef>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
    pub modified: DateTime<Utc>,
}

impl MovieDocument {
    /// Builds the redundant flattened name lists from the structured
    /// actor/writer sets. Called once at aggregation time so the
    /// invariant in spec §3/§8 always holds by construction.
    pub fn names_from_people(actors: &[PersonRef], writers: &[PersonRef]) -> (Vec<String>, Vec<String>) {
        (
            actors.iter().map(|p| p.name.clone()).collect(),
            writers.iter().map(|p| p.name.clone()).collect(),
        )
    }
}

/// The short film shape returned by list/search/sort endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortFilm {
    pub uuid: Uuid,
    pub title: String,
    pub imdb_rating: Option<f64>,
}

/// The full film shape returned by `GET /films/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailFilm {
    pub uuid: Uuid,
    pub title: String,
    pub imdb_rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<GenreRef>,
    pub actors: Vec<PersonRef>,
    pub writers: Vec<PersonRef>,
    pub directors: Vec<PersonRef>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
}

impl DetailFilm {
    /// Assembles a `DetailFilm` from an indexed `MovieDocument` plus the
    /// genre ids resolved by a secondary lookup (spec §4.9).
    pub fn from_document(doc: MovieDocument, genres: Vec<GenreRef>) -> Self {
        Self {
            uuid: doc.id,
            title: doc.title,
            imdb_rating: doc.imdb_rating,
            description: doc.description,
            genre: genres,
            actors: doc.actors,
            writers: doc.writers,
            directors: doc.director,
            actors_names: doc.actors_names,
            writers_names: doc.writers_names,
        }
    }
}
