//! Persistence settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `MEALPLAN_*` environment variables and an
//! optional configuration file, in that order of precedence.

use std::time::Duration;

use ortho_config::OrthoConfig;
use pagination::{DEFAULT_LIMIT, MAX_LIMIT};
use serde::Deserialize;

use crate::domain::{TieBreakSource, UnknownValue};
use crate::outbound::persistence::PoolConfig;

/// Configuration for the `Querier` and its connection pool.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "MEALPLAN")]
pub struct QuerierSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Page size used when a list call supplies no filter or limit.
    pub default_page_size: Option<u8>,
    /// Randomness source for voting tie-breaks: `prng` or `crypto`.
    pub tie_break_rng: Option<String>,
    /// Upper bound on pooled connections.
    pub pool_max_size: Option<u32>,
    /// Idle connections kept warm.
    pub pool_min_idle: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub pool_connection_timeout_secs: Option<u64>,
}

impl QuerierSettings {
    /// Configured page size clamped to `1..=MAX_LIMIT`.
    pub fn default_page_size(&self) -> u8 {
        self.default_page_size
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT)
    }

    /// Parse the configured tie-break source, defaulting to the process PRNG.
    pub fn tie_break_source(&self) -> Result<TieBreakSource, UnknownValue> {
        self.tie_break_rng
            .as_deref()
            .map_or(Ok(TieBreakSource::default()), str::parse)
    }

    /// Pool configuration, or `None` when no database URL is configured.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        let url = self.database_url.as_deref()?;
        let mut config = PoolConfig::new(url);
        if let Some(max_size) = self.pool_max_size {
            config = config.with_max_size(max_size);
        }
        if let Some(min_idle) = self.pool_min_idle {
            config = config.with_min_idle(Some(min_idle));
        }
        if let Some(secs) = self.pool_connection_timeout_secs {
            config = config.with_connection_timeout(Duration::from_secs(secs));
        }
        Some(config)
    }
}
