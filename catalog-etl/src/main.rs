//! Producer -> Merger -> Enricher -> Aggregator -> Loader daemon (spec
//! §2, §5): loads configuration, opens the shared Postgres pool and
//! Elasticsearch client once, then loops `run_once` on a fixed
//! interval, matching the original pipeline's bare `while True: ...;
//! sleep(SLEEP_TIME)` shape but with each dependency constructed a
//! single time up front instead of re-opened every cycle.

mod aggregator;
mod enricher;
mod loader;
mod merger;
mod pipeline;
mod producer;

use std::sync::Arc;

use catalog_core::backoff::BackoffDriver;
use catalog_core::config::{BackoffConfig, ElasticConfig, EtlConfig, PostgresConfig};
use catalog_core::search::ElasticsearchIndex;
use catalog_core::state::State;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const INDICES: [&str; 3] = ["movies", "genres", "persons"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog_core::config::load_dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_etl=info,catalog_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let postgres_cfg = PostgresConfig::from_env()?;
    let elastic_cfg = ElasticConfig::from_env()?;
    let backoff_cfg = BackoffConfig::from_env()?;
    let etl_cfg = EtlConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&postgres_cfg.connection_string())
        .await?;
    info!("connected to postgres");

    let search = ElasticsearchIndex::connect(&elastic_cfg.url())?;
    let driver = BackoffDriver::new(&backoff_cfg);
    let state = Arc::new(Mutex::new(State::open(etl_cfg.state_path.as_str())?));

    let index_path = std::path::PathBuf::from(&elastic_cfg.index_path);
    for index in INDICES {
        let mapping = loader::load_mapping(&index_path, index)?;
        loader::ensure_index(&search, index, mapping).await?;
    }

    loop {
        match pipeline::run_once(&pool, &driver, &postgres_cfg.schema, state.clone(), &search, elastic_cfg.batch)
            .await
        {
            Ok(count) => info!(count, "sync cycle finished"),
            Err(err) => warn!(%err, "sync cycle failed, will retry next cycle"),
        }
        tokio::time::sleep(etl_cfg.sleep_time).await;
    }
}
