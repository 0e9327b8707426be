//! Shared domain model, configuration, state store, retry driver, cache
//! client and search-index client for the movie catalog ETL and query
//! API. Played the same role `ferrex-core` plays for `ferrex-server` and
//! `ferrex-player`: one library, two front-ends.

pub mod backoff;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod search;
pub mod state;

pub use error::{CatalogError, Result};
