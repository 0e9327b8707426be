//! Route table (spec §6), grounded on `ferrex-server::routes::v1`'s
//! `create_v1_router` shape: one `Router::new()` with every path wired
//! to its handler, merged under the versioned `/api/v1` prefix.

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/films/:film_id", get(handlers::get_film))
        .route("/films/", get(handlers::list_films))
        .route("/films/search", get(handlers::search_films))
        .route("/genres/", get(handlers::list_genres))
        .route("/genres/:genre_id", get(handlers::get_genre))
        .route("/persons/:person_id", get(handlers::get_person))
        .route("/persons/:person_id/film/", get(handlers::get_person_films))
        .route("/persons/search/", get(handlers::search_persons))
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", create_v1_router())
        .with_state(state)
}
