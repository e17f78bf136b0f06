//! PostgreSQL connection pooling.
//!
//! Pool sizing comes from `STUDIA_DB_*` environment variables so
//! deployments can tune connection pressure without a rebuild; code that
//! needs specific sizing (tests, one-off tools) passes a [`PoolConfig`]
//! explicitly.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use studia_core::{Error, Result};

/// Environment variable naming the pool's connection ceiling.
pub const ENV_MAX_CONNECTIONS: &str = "STUDIA_DB_MAX_CONNECTIONS";
/// Environment variable naming the pool's connection floor.
pub const ENV_MIN_CONNECTIONS: &str = "STUDIA_DB_MIN_CONNECTIONS";
/// Environment variable bounding connection acquisition, in seconds.
pub const ENV_ACQUIRE_TIMEOUT: &str = "STUDIA_DB_ACQUIRE_TIMEOUT_SECS";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;

/// Pool sizing and timeout settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            max_lifetime: Some(Duration::from_secs(DEFAULT_MAX_LIFETIME_SECS)),
        }
    }
}

impl PoolConfig {
    /// Build a config from the `STUDIA_DB_*` variables, keeping the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_connections: parsed_or(
                std::env::var(ENV_MAX_CONNECTIONS).ok(),
                defaults.max_connections,
            ),
            min_connections: parsed_or(
                std::env::var(ENV_MIN_CONNECTIONS).ok(),
                defaults.min_connections,
            ),
            connect_timeout: Duration::from_secs(parsed_or(
                std::env::var(ENV_ACQUIRE_TIMEOUT).ok(),
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )),
            ..defaults
        }
    }

    fn options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(self.idle_timeout);
        if let Some(lifetime) = self.max_lifetime {
            options = options.max_lifetime(lifetime);
        }
        options
    }
}

fn parsed_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Connect a pool sized from the environment.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::from_env()).await
}

/// Connect a pool with explicit settings.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();
    let pool = config
        .options()
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.connect_timeout.as_secs(),
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database connection pool established"
    );
    Ok(pool)
}
