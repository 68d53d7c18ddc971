//! Connection pool for the PostgreSQL item store.
//!
//! Settings come from `TESSERA_DB_*` variables on top of
//! `tessera_core::defaults`; malformed or out-of-range values are logged
//! and the default is kept.

use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use tessera_core::{defaults, Error, Result};

/// Pool settings for [`crate::PgStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// How long a store call waits for a free connection.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::DB_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(defaults::DB_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(defaults::DB_IDLE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(n) = parse_in_range(
            "TESSERA_DB_MAX_CONNECTIONS",
            lookup("TESSERA_DB_MAX_CONNECTIONS"),
            1..=defaults::DB_MAX_CONNECTIONS_LIMIT,
        ) {
            config.max_connections = n;
        }
        if let Some(secs) = parse_in_range(
            "TESSERA_DB_ACQUIRE_TIMEOUT_SECS",
            lookup("TESSERA_DB_ACQUIRE_TIMEOUT_SECS"),
            1..=300,
        ) {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        config
    }
}

fn parse_in_range<T>(key: &str, raw: Option<String>, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd + std::fmt::Display,
{
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(v) if range.contains(&v) => Some(v),
        Ok(v) => {
            warn!(
                subsystem = "database",
                variable = key,
                value = %v,
                min = %range.start(),
                max = %range.end(),
                "Pool setting out of range, using default"
            );
            None
        }
        Err(_) => {
            warn!(
                subsystem = "database",
                variable = key,
                value = %raw,
                "Invalid pool setting, using default"
            );
            None
        }
    }
}

/// Open a pool against `database_url`.
pub async fn open_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();
    info!(
        subsystem = "database",
        component = "pool",
        op = "open",
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        "Opening item store pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "open",
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Item store pool ready"
    );
    Ok(pool)
}
