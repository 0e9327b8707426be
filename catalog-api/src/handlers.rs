//! HTTP handlers (spec §6). Thin translation layer over the query
//! services: extract and validate request shape, call the service, map
//! its `Option` ("absent") result to 404, map validation failures to
//! 422 via [`AppError`]. Modeled on `ferrex-server`'s
//! `State(state): State<AppState>` + `Path`/`Query` extractor handlers
//! (e.g. `movie_handlers::movie_details_handler`).

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use catalog_core::model::{DetailFilm, Genre, Person, PersonFilm, ShortFilm};

use crate::error::{AppError, AppResult};
use crate::pagination::Page;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PagingQuery {
    pub page_size: Option<u32>,
    pub page_number: Option<u32>,
}

impl PagingQuery {
    fn validated(&self) -> AppResult<Page> {
        Ok(Page::validate(self.page_size, self.page_number)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct FilmListQuery {
    pub sort: Option<String>,
    pub genre_id: Option<Uuid>,
    #[serde(flatten)]
    pub paging: PagingQuery,
}

#[derive(Debug, Deserialize)]
pub struct FilmSearchQuery {
    pub film_title: String,
    #[serde(flatten)]
    pub paging: PagingQuery,
}

#[derive(Debug, Deserialize)]
pub struct PersonSearchQuery {
    pub person_name: String,
    #[serde(flatten)]
    pub paging: PagingQuery,
}

/// Default sort when the caller omits it: ascending by rating, the
/// least surprising choice for a listing endpoint (spec.md is silent on
/// a default; resolved here and recorded in DESIGN.md).
const DEFAULT_SORT: &str = "imdb_rating";

pub async fn get_film(State(state): State<AppState>, Path(film_id): Path<Uuid>) -> AppResult<Json<DetailFilm>> {
    match state.films.get_by_id(film_id).await? {
        Some(film) => Ok(Json(film)),
        None => Err(AppError::not_found(format!("film `{film_id}` not found"))),
    }
}

pub async fn list_films(State(state): State<AppState>, Query(query): Query<FilmListQuery>) -> AppResult<Json<Vec<ShortFilm>>> {
    let page = query.paging.validated()?;
    let sort = query.sort.as_deref().unwrap_or(DEFAULT_SORT);
    match state.films.get_by_sort(sort, page, query.genre_id).await? {
        Some(films) => Ok(Json(films)),
        None => Err(AppError::not_found("no films match the given filters")),
    }
}

pub async fn search_films(State(state): State<AppState>, Query(query): Query<FilmSearchQuery>) -> AppResult<Json<Vec<ShortFilm>>> {
    let page = query.paging.validated()?;
    match state.films.get_by_query(&query.film_title, page).await? {
        Some(films) => Ok(Json(films)),
        None => Err(AppError::not_found(format!("no films match `{}`", query.film_title))),
    }
}

pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    match state.genres.get_all().await? {
        Some(genres) => Ok(Json(genres)),
        None => Err(AppError::not_found("no genres indexed")),
    }
}

pub async fn get_genre(State(state): State<AppState>, Path(genre_id): Path<Uuid>) -> AppResult<Json<Genre>> {
    match state.genres.get_by_id(genre_id).await? {
        Some(genre) => Ok(Json(genre)),
        None => Err(AppError::not_found(format!("genre `{genre_id}` not found"))),
    }
}

pub async fn get_person(State(state): State<AppState>, Path(person_id): Path<Uuid>) -> AppResult<Json<Person>> {
    match state.persons.get_by_id(person_id).await? {
        Some(person) => Ok(Json(person)),
        None => Err(AppError::not_found(format!("person `{person_id}` not found"))),
    }
}

pub async fn get_person_films(State(state): State<AppState>, Path(person_id): Path<Uuid>) -> AppResult<Json<Vec<PersonFilm>>> {
    match state.persons.get_films_for_person(person_id).await? {
        Some(films) => Ok(Json(films)),
        None => Err(AppError::not_found(format!("no films found for person `{person_id}`"))),
    }
}

pub async fn search_persons(State(state): State<AppState>, Query(query): Query<PersonSearchQuery>) -> AppResult<Json<Vec<Person>>> {
    let page = query.paging.validated()?;
    match state.persons.search_person(&query.person_name, page).await? {
        Some(persons) => Ok(Json(persons)),
        None => Err(AppError::not_found(format!("no persons match `{}`", query.person_name))),
    }
}

pub async fn health() -> &'static str {
    "ok"
}
