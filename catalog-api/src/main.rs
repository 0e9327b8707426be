//! Cached query API daemon (spec §2, §6): loads configuration, opens
//! the shared Redis and Elasticsearch clients once, builds the three
//! query services over one [`cache_aside::CacheAside`] collaborator
//! each, and serves the Axum router. Matches `ferrex-server::main`'s
//! shape (config load -> client construction -> `AppState` -> `axum::serve`)
//! but without ferrex's TLS/rate-limit/auth layers, which spec §1
//! explicitly scopes out as external collaborators.

mod cache_aside;
mod error;
mod handlers;
mod pagination;
mod routes;
mod services;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use catalog_core::cache::{Cache, RedisCache};
use catalog_core::config::{ApiConfig, ElasticConfig, RedisConfig};
use catalog_core::search::{ElasticsearchIndex, SearchIndex};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache_aside::CacheAside;
use crate::services::{FilmService, GenreService, PersonService};

#[derive(Clone)]
pub struct AppState {
    films: Arc<FilmService>,
    genres: Arc<GenreService>,
    persons: Arc<PersonService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog_core::config::load_dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_api=info,catalog_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let elastic_cfg = ElasticConfig::from_env()?;
    let redis_cfg = RedisConfig::from_env()?;
    let api_cfg = ApiConfig::from_env()?;

    let search: Arc<dyn SearchIndex> = Arc::new(ElasticsearchIndex::connect(&elastic_cfg.url())?);
    let cache: Arc<dyn Cache> = Arc::new(RedisCache::connect(&redis_cfg.url()).await?);
    info!("connected to elasticsearch and redis");

    let aside = CacheAside::new(cache, search, api_cfg.cache_ttl);
    let state = AppState {
        films: Arc::new(FilmService::new(aside.clone())),
        genres: Arc::new(GenreService::new(aside.clone())),
        persons: Arc::new(PersonService::new(aside)),
    };

    let app = routes::create_app(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = api_cfg
        .service_url
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8000)));
    info!(%addr, "starting catalog-api");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
