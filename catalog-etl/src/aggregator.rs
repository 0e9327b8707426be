//! Aggregator / Transform (spec §4.6).
//!
//! Stateful fold over the enricher row stream: holds a "current film"
//! and four accumulators (directors, actors, writers, genres), emitting
//! one completed [`MovieDocument`] every time the film id changes and
//! once more at end of input.
//!
//! Invariant (spec §4.6, §8): the input must already be grouped by
//! `film_id`; non-grouped input yields duplicate documents for the
//! same id, by design — this function does not re-sort.

use std::collections::BTreeSet;

use catalog_core::model::{MovieDocument, PersonRef};

use crate::enricher::EnricherRow;

#[derive(Default)]
struct Accumulators {
    directors: BTreeSet<PersonRef>,
    actors: BTreeSet<PersonRef>,
    writers: BTreeSet<PersonRef>,
    genres: BTreeSet<String>,
}

impl Accumulators {
    fn add_person(&mut self, row: &EnricherRow) {
        let (Some(person_id), Some(name)) = (row.person_id, row.person_full_name.clone()) else {
            return;
        };
        let person = PersonRef { id: person_id, name };
        match row.role.as_deref() {
            Some("actor") => {
                self.actors.insert(person);
            }
            Some("writer") => {
                self.writers.insert(person);
            }
            Some("director") => {
                self.directors.insert(person);
            }
            _ => {}
        }
    }

    fn add_genre(&mut self, row: &EnricherRow) {
        if let Some(genre) = row.genre_name.clone() {
            self.genres.insert(genre);
        }
    }

    fn into_document(self, row: &EnricherRow) -> MovieDocument {
        let actors: Vec<PersonRef> = self.actors.into_iter().collect();
        let writers: Vec<PersonRef> = self.writers.into_iter().collect();
        let (actors_names, writers_names) = MovieDocument::names_from_people(&actors, &writers);
        MovieDocument {
            id: row.film_id,
            title: row.title.clone(),
            description: row.description.clone(),
            imdb_rating: row.rating,
            genre: self.genres.into_iter().collect(),
            director: self.directors.into_iter().collect(),
            actors,
            writers,
            actors_names,
            writers_names,
            modified: row.modified,
        }
    }
}

/// Folds `rows` (already grouped by `film_id`) into one [`MovieDocument`]
/// per distinct film.
pub fn aggregate(rows: &[EnricherRow]) -> Vec<MovieDocument> {
    let mut out = Vec::new();
    let mut acc = Accumulators::default();
    let mut current: Option<&EnricherRow> = None;

    for row in rows {
        match current {
            None => current = Some(row),
            Some(cur) if cur.film_id != row.film_id => {
                out.push(std::mem::take(&mut acc).into_document(cur));
                current = Some(row);
            }
            _ => {}
        }
        acc.add_person(row);
        acc.add_genre(row);
    }
    if let Some(cur) = current {
        out.push(acc.into_document(cur));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn row(film_id: Uuid, role: &str, person_id: Uuid, name: &str, genre: &str) -> EnricherRow {
        EnricherRow {
            film_id,
            title: "Some Title".into(),
            description: Some("desc".into()),
            rating: Some(8.5),
            film_type: Some("movie".into()),
            created: Utc::now(),
            modified: Utc::now(),
            role: Some(role.into()),
            person_id: Some(person_id),
            person_full_name: Some(name.into()),
            genre_name: Some(genre.into()),
        }
    }

    #[test]
    fn one_document_per_distinct_grouped_film_id() {
        let film_a = Uuid::new_v4();
        let film_b = Uuid::new_v4();
        let rows = vec![
            row(film_a, "actor", Uuid::new_v4(), "Alice", "Drama"),
            row(film_a, "director", Uuid::new_v4(), "Bob", "Drama"),
            row(film_b, "writer", Uuid::new_v4(), "Carol", "Comedy"),
        ];
        let docs = aggregate(&rows);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, film_a);
        assert_eq!(docs[1].id, film_b);
    }

    #[test]
    fn names_are_exactly_the_projection_of_structured_people() {
        let film = Uuid::new_v4();
        let rows = vec![
            row(film, "actor", Uuid::new_v4(), "Alice", "Drama"),
            row(film, "actor", Uuid::new_v4(), "Zoe", "Drama"),
            row(film, "writer", Uuid::new_v4(), "Carol", "Drama"),
        ];
        let docs = aggregate(&rows);
        let doc = &docs[0];
        assert_eq!(doc.actors.len(), doc.actors_names.len());
        assert_eq!(doc.writers.len(), doc.writers_names.len());
        for (person, name) in doc.actors.iter().zip(doc.actors_names.iter()) {
            assert_eq!(&person.name, name);
        }
    }

    #[test]
    fn film_with_no_people_still_has_empty_not_missing_lists() {
        let film = Uuid::new_v4();
        let rows = vec![EnricherRow {
            film_id: film,
            title: "Solo".into(),
            description: None,
            rating: None,
            film_type: Some("movie".into()),
            created: Utc::now(),
            modified: Utc::now(),
            role: None,
            person_id: None,
            person_full_name: None,
            genre_name: None,
        }];
        let docs = aggregate(&rows);
        assert_eq!(docs.len(), 1);
        assert!(docs[0].actors.is_empty());
        assert!(docs[0].genre.is_empty());
    }

    #[test]
    fn non_grouped_input_yields_duplicate_documents() {
        let film_a = Uuid::new_v4();
        let film_b = Uuid::new_v4();
        let rows = vec![
            row(film_a, "actor", Uuid::new_v4(), "Alice", "Drama"),
            row(film_b, "actor", Uuid::new_v4(), "Bob", "Comedy"),
            row(film_a, "writer", Uuid::new_v4(), "Carol", "Drama"),
        ];
        let docs = aggregate(&rows);
        assert_eq!(docs.iter().filter(|d| d.id == film_a).count(), 2);
    }
}
