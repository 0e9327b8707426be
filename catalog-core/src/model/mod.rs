mod film;
mod genre;
mod person;

pub use film::{DetailFilm, GenreRef, MovieDocument, PersonRef, ShortFilm};
pub use genre::Genre;
pub use person::{Person, PersonDocument, PersonFilm, PersonFilmCredit};
