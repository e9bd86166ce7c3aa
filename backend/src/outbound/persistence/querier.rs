//! The `Querier` façade implementing every persistence port.
//!
//! A `Querier` is cheap to clone and safe to share between tasks: it holds
//! the connection pool plus shared, thread-safe collaborators for time,
//! identifiers, secrets and voting tie-breaks. Each port is implemented in
//! its own `diesel_*` module; this file only wires the collaborators.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use pagination::{DEFAULT_LIMIT, MAX_LIMIT, QueryFilter};

use super::pool::{DbPool, PoolError};
use crate::config::QuerierSettings;
use crate::domain::{
    IdGenerator, RandomSecretGenerator, SecretGenerator, TieBreaker, UnknownValue,
    UuidIdGenerator,
};

/// Reasons a [`Querier`] cannot be built from settings.
#[derive(Debug, thiserror::Error)]
pub enum QuerierSetupError {
    /// No database URL was configured.
    #[error("no database url configured")]
    MissingDatabaseUrl,
    /// The tie-break source is not recognised.
    #[error(transparent)]
    TieBreakSource(#[from] UnknownValue),
    /// The connection pool could not be built.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// PostgreSQL-backed implementation of every repository port.
///
/// # Examples
/// ```no_run
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// use backend::domain::ports::UserRepository;
/// use backend::outbound::persistence::{DbPool, PoolConfig, Querier};
///
/// let pool = DbPool::new(PoolConfig::new("postgres://localhost/mealplan")).await?;
/// let querier = Querier::new(pool);
/// let exists = querier.user_exists("user-id").await?;
/// # let _ = exists;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Querier {
    pub(crate) pool: DbPool,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) secrets: Arc<dyn SecretGenerator>,
    pub(crate) tie_breaker: Arc<TieBreaker>,
    pub(crate) default_page_size: u8,
}

impl Querier {
    /// Build a querier with production collaborators.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            clock: Arc::new(DefaultClock),
            ids: Arc::new(UuidIdGenerator),
            secrets: Arc::new(RandomSecretGenerator),
            tie_breaker: Arc::new(TieBreaker::default()),
            default_page_size: DEFAULT_LIMIT,
        }
    }

    /// Build the pool and collaborators described by `settings`.
    ///
    /// # Errors
    ///
    /// Fails when no database URL is set, the tie-break source is unknown,
    /// or the pool cannot open its initial connections.
    pub async fn from_settings(settings: &QuerierSettings) -> Result<Self, QuerierSetupError> {
        let pool_config = settings
            .pool_config()
            .ok_or(QuerierSetupError::MissingDatabaseUrl)?;
        let source = settings.tie_break_source()?;
        let pool = DbPool::new(pool_config).await?;

        Ok(Self::new(pool)
            .with_tie_breaker(TieBreaker::new(source))
            .with_default_page_size(settings.default_page_size()))
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the identifier generator.
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replace the secret generator.
    #[must_use]
    pub fn with_secrets(mut self, secrets: Arc<dyn SecretGenerator>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Replace the voting tie-breaker.
    #[must_use]
    pub fn with_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = Arc::new(tie_breaker);
        self
    }

    /// Page size applied when a list call supplies no limit.
    #[must_use]
    pub fn with_default_page_size(mut self, page_size: u8) -> Self {
        self.default_page_size = page_size.clamp(1, MAX_LIMIT);
        self
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Fill in the configured page size when the caller gave no limit.
    pub(crate) fn effective_filter(&self, filter: Option<QueryFilter>) -> QueryFilter {
        filter
            .unwrap_or_default()
            .with_default_limit(self.default_page_size)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A querier whose pool can never connect, for validation tests.

    use std::time::Duration;

    use super::Querier;
    use crate::outbound::persistence::{DbPool, PoolConfig};

    /// Any checkout fails with a connection error, so an operation that
    /// returns a validation error provably never reached the database.
    pub(crate) fn unreachable_querier() -> Querier {
        let config = PoolConfig::new("postgres://mealplan@127.0.0.1:1/unreachable")
            .with_max_size(1)
            .with_connection_timeout(Duration::from_millis(200));
        Querier::new(DbPool::new_lazy(&config))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::unreachable_querier;
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn missing_filter_uses_configured_page_size() {
        let querier = unreachable_querier().with_default_page_size(7);

        let filter = querier.effective_filter(None);

        assert_eq!(filter.limit(), 7);
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.offset(), 0);
    }

    #[tokio::test]
    async fn explicit_limit_wins_over_default() {
        let querier = unreachable_querier().with_default_page_size(7);

        let filter = querier.effective_filter(Some(QueryFilter::default().with_limit(3).with_page(2)));

        assert_eq!(filter.limit(), 3);
        assert_eq!(filter.offset(), 3);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(255, MAX_LIMIT)]
    #[tokio::test]
    async fn page_size_is_clamped(#[case] requested: u8, #[case] expected: u8) {
        let querier = unreachable_querier().with_default_page_size(requested);

        assert_eq!(querier.default_page_size, expected);
    }

    #[tokio::test]
    async fn settings_without_database_url_are_rejected() {
        let settings = QuerierSettings {
            database_url: None,
            default_page_size: None,
            tie_break_rng: None,
            pool_max_size: None,
            pool_min_idle: None,
            pool_connection_timeout_secs: None,
        };

        let result = Querier::from_settings(&settings).await;

        assert!(matches!(result, Err(QuerierSetupError::MissingDatabaseUrl)));
    }
}
