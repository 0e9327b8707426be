//! Environment-driven configuration shared by both binaries.
//!
//! Each field maps to one of the `POSTGRES_*` / `ELASTIC_*` / `REDIS_*` /
//! `BACKOFF_*` environment variables enumerated in spec §6. Loading is a
//! one-shot affair at process start (no hot reload), in the spirit of
//! `ferrex-server`'s `infra::config::ConfigLoader` but proportioned to a
//! handful of flat structs instead of a TOML-plus-env merge.

use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    Missing(String),
    #[error("invalid value for `{name}`: {value}")]
    Invalid { name: String, value: String },
}

fn env_var(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name.to_string()))
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

/// Attempts to load a `.env` file once; a missing file is not an error,
/// matching `ConfigLoader::load`'s `dotenvy::Error::Io` fallback.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(_) | Err(dotenvy::Error::Io(_)) => {}
        Err(err) => tracing::warn!(%err, "failed to parse .env file"),
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub schema: String,
    pub batch_size: u32,
}

impl PostgresConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dbname: env_var("POSTGRES_DB")?,
            user: env_var("POSTGRES_USER")?,
            password: env_var("POSTGRES_PASSWORD")?,
            host: env_or("POSTGRES_HOST", "localhost".to_string())?,
            port: env_or("POSTGRES_PORT", 5432u16)?,
            schema: env_or("POSTGRES_SCHEMA", "content".to_string())?,
            batch_size: env_or("POSTGRES_BATCH", 1000u32)?,
        })
    }

    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.dbname
        )
    }
}

#[derive(Debug, Clone)]
pub struct ElasticConfig {
    pub host: String,
    pub port: u16,
    pub index: String,
    pub batch: usize,
    pub index_path: String,
}

impl ElasticConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or("ELASTIC_HOST", "localhost".to_string())?,
            port: env_or("ELASTIC_PORT", 9200u16)?,
            index: env_or("ELASTIC_INDEX", "movies".to_string())?,
            batch: env_or("ELASTIC_BATCH", 1000usize)?,
            index_path: env_or("INDEX_PATH", "mapping".to_string())?,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

impl RedisConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or("REDIS_HOST", "localhost".to_string())?,
            port: env_or("REDIS_PORT", 6379u16)?,
        })
    }

    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub start: Duration,
    pub factor: f64,
    pub border: Duration,
}

impl BackoffConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let start_secs: f64 = env_or("BACKOFF_START_TIME", 0.1f64)?;
        let factor: f64 = env_or("BACKOFF_FACTOR", 2.0f64)?;
        let border_secs: f64 = env_or("BACKOFF_BORDER_TIME", 10.0f64)?;
        Ok(Self {
            start: Duration::from_secs_f64(start_secs),
            factor,
            border: Duration::from_secs_f64(border_secs),
        })
    }
}

/// ETL-only knobs: the watermark file path and the poll interval between
/// full pipeline runs (spec §5).
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub state_path: String,
    pub sleep_time: Duration,
}

impl EtlConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            state_path: env_or("STATE_PATH", "state.json".to_string())?,
            sleep_time: Duration::from_secs(env_or("SLEEP_TIME", 10u64)?),
        })
    }
}

/// API-only knobs.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub service_url: String,
    pub cache_ttl: Duration,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            service_url: env_or("SERVICE_URL", "0.0.0.0:8000".to_string())?,
            cache_ttl: Duration::from_secs(300),
        })
    }
}
